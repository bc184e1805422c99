//! Storage module for persisting analysis jobs
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Compare-and-set status transitions
//! - Listing, filtering and counting jobs

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{JobStore, StorageError, StorageResult};

use crate::state::{AnalysisJob, JobStatus};
use crate::InspectorError;

use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, InspectorError> {
    Ok(SqliteStorage::new(path)?)
}

/// Filtering and pagination for job listings
#[derive(Debug, Clone)]
pub struct JobQuery {
    /// 1-based page number
    pub page: u32,
    /// Page size
    pub limit: u32,
    /// Substring matched against url and title
    pub search: Option<String>,
    pub status: Option<JobStatus>,
    /// Caller-chosen order; `None` lists active jobs first, then the most
    /// recently updated
    pub sort: Option<JobSort>,
}

impl Default for JobQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            search: None,
            status: None,
            sort: None,
        }
    }
}

impl JobQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.limit.max(1))
    }
}

/// Columns a listing can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    CreatedAt,
    UpdatedAt,
    Url,
    Title,
    Status,
}

impl SortColumn {
    /// Parses a column name as accepted on the console
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "created_at" | "created" => Some(Self::CreatedAt),
            "updated_at" | "updated" => Some(Self::UpdatedAt),
            "url" => Some(Self::Url),
            "title" => Some(Self::Title),
            "status" => Some(Self::Status),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Url => "url",
            Self::Title => "title",
            Self::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Explicit listing order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSort {
    pub column: SortColumn,
    pub order: SortOrder,
}

impl JobSort {
    /// Parses `column` or `column:order`, e.g. `url:asc`
    pub fn parse(text: &str) -> Option<Self> {
        let (column, order) = match text.split_once(':') {
            Some((column, order)) => (column, SortOrder::from_name(order)?),
            None => (text, SortOrder::default()),
        };
        Some(Self {
            column: SortColumn::from_name(column)?,
            order,
        })
    }
}

/// One page of a job listing
#[derive(Debug, Clone)]
pub struct JobPage {
    pub jobs: Vec<AnalysisJob>,
    /// Number of jobs matching the filters, across all pages
    pub total_count: u64,
    /// Per-status counts over the whole table
    pub status_counts: StatusCounts,
}

/// Number of jobs in each status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub queued: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl StatusCounts {
    pub fn get(&self, status: JobStatus) -> u64 {
        match status {
            JobStatus::Queued => self.queued,
            JobStatus::Processing => self.processing,
            JobStatus::Completed => self.completed,
            JobStatus::Failed => self.failed,
            JobStatus::Cancelled => self.cancelled,
        }
    }

    pub fn add(&mut self, status: JobStatus, count: u64) {
        let slot = match status {
            JobStatus::Queued => &mut self.queued,
            JobStatus::Processing => &mut self.processing,
            JobStatus::Completed => &mut self.completed,
            JobStatus::Failed => &mut self.failed,
            JobStatus::Cancelled => &mut self.cancelled,
        };
        *slot += count;
    }

    pub fn total(&self) -> u64 {
        JobStatus::all_states().iter().map(|s| self.get(*s)).sum()
    }
}
