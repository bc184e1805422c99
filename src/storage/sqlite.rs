//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the JobStore trait.
//! The connection lives behind a mutex so the worker task and control
//! operations can share one store.

use crate::state::{AnalysisJob, AnalysisResult, HtmlVersion, JobStatus, JobTransition};
use crate::storage::schema::{get_schema_version, initialize_schema, JOB_COLUMNS};
use crate::storage::traits::{JobStore, StorageError, StorageResult};
use crate::storage::{JobPage, JobQuery, JobSort, StatusCounts};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const EMPTY_JSON_MAP: &str = "{}";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;
        tracing::debug!(
            "Opened {} (schema v{})",
            path.display(),
            get_schema_version()
        );

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Applies `transition` to job `id` if its current status allows it
    fn apply_transition(
        &self,
        id: &str,
        transition: JobTransition,
        result: Option<&AnalysisResult>,
    ) -> StorageResult<bool> {
        let sources = status_list(transition.sources());
        let target = transition.target().to_db_string();
        let now = Utc::now();
        let conn = self.conn()?;

        let changed = match result {
            Some(result) => conn.execute(
                &format!(
                    "UPDATE jobs SET status = ?1, updated_at = ?2, completed_at = ?2,
                     html_version = ?3, title = ?4, headings = ?5, internal_links = ?6,
                     external_links = ?7, broken_links = ?8, has_login_form = ?9
                     WHERE id = ?10 AND status IN ({})",
                    sources
                ),
                params![
                    target,
                    now,
                    result.html_version.map(|v| v.as_str()),
                    result.title,
                    serde_json::to_string(&result.headings)?,
                    result.internal_links,
                    result.external_links,
                    serde_json::to_string(&result.broken_links)?,
                    result.has_login_form,
                    id
                ],
            )?,
            None if transition.clears_results() => conn.execute(
                &format!(
                    "UPDATE jobs SET status = ?1, updated_at = ?2, completed_at = NULL,
                     html_version = NULL, title = '', headings = ?3, internal_links = 0,
                     external_links = 0, broken_links = ?3, has_login_form = 0
                     WHERE id = ?4 AND status IN ({})",
                    sources
                ),
                params![target, now, EMPTY_JSON_MAP, id],
            )?,
            None => conn.execute(
                &format!(
                    "UPDATE jobs SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status IN ({})",
                    sources
                ),
                params![target, now, id],
            )?,
        };

        Ok(changed > 0)
    }
}

impl JobStore for SqliteStorage {
    // ===== Request-side Operations =====

    fn insert_job(&self, url: &str) -> StorageResult<AnalysisJob> {
        let job = AnalysisJob::new_queued(url);
        self.conn()?.execute(
            "INSERT INTO jobs (id, url, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                job.id,
                job.url,
                job.status.to_db_string(),
                job.created_at,
                job.updated_at
            ],
        )?;
        Ok(job)
    }

    fn get_job(&self, id: &str) -> StorageResult<Option<AnalysisJob>> {
        let row = self
            .conn()?
            .query_row(
                &format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS),
                params![id],
                JobRow::from_row,
            )
            .optional()?;

        row.map(JobRow::into_job).transpose()
    }

    fn list_jobs(&self, query: &JobQuery) -> StorageResult<JobPage> {
        let mut clauses = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            clauses.push("(url LIKE ? OR title LIKE ?)");
            let pattern = format!("%{}%", search);
            args.push(pattern.clone());
            args.push(pattern);
        }
        if let Some(status) = query.status {
            clauses.push("status = ?");
            args.push(status.to_db_string().to_string());
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let (total_count, rows) = {
            let conn = self.conn()?;

            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM jobs {}", where_sql),
                params_from_iter(args.iter()),
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM jobs {} ORDER BY {} LIMIT {} OFFSET {}",
                JOB_COLUMNS,
                where_sql,
                order_by(query.sort),
                query.limit.max(1),
                query.offset()
            ))?;
            let rows = stmt
                .query_map(params_from_iter(args.iter()), JobRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            (total as u64, rows)
        };

        let jobs = rows
            .into_iter()
            .map(JobRow::into_job)
            .collect::<StorageResult<Vec<_>>>()?;

        Ok(JobPage {
            jobs,
            total_count,
            status_counts: self.count_by_status()?,
        })
    }

    fn count_by_status(&self) -> StorageResult<StatusCounts> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM jobs GROUP BY status")?;

        let mut counts = StatusCounts::default();
        let rows = stmt.query_map([], |row| {
            let status: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((status, count))
        })?;

        for row in rows {
            let (status_str, count) = row?;
            match JobStatus::from_db_string(&status_str) {
                Some(status) => counts.add(status, count as u64),
                None => tracing::warn!("Ignoring {} jobs with unknown status '{}'", count, status_str),
            }
        }

        Ok(counts)
    }

    fn delete_jobs(&self, ids: &[String]) -> StorageResult<u64> {
        let conn = self.conn()?;
        let mut deleted = 0;
        for id in ids {
            deleted += conn.execute("DELETE FROM jobs WHERE id = ?1", params![id])? as u64;
        }
        Ok(deleted)
    }

    // ===== Worker-side Operations =====

    fn fetch_next_queued(&self) -> StorageResult<Option<AnalysisJob>> {
        let row = self
            .conn()?
            .query_row(
                &format!(
                    "SELECT {} FROM jobs WHERE status = ?1 ORDER BY created_at ASC, rowid ASC LIMIT 1",
                    JOB_COLUMNS
                ),
                params![JobStatus::Queued.to_db_string()],
                JobRow::from_row,
            )
            .optional()?;

        row.map(JobRow::into_job).transpose()
    }

    fn mark_processing(&self, id: &str) -> StorageResult<bool> {
        self.apply_transition(id, JobTransition::Claim, None)
    }

    fn mark_completed(&self, id: &str, result: &AnalysisResult) -> StorageResult<bool> {
        self.apply_transition(id, JobTransition::Complete, Some(result))
    }

    fn mark_failed(&self, id: &str) -> StorageResult<bool> {
        self.apply_transition(id, JobTransition::Fail, None)
    }

    fn mark_cancelled(&self, id: &str) -> StorageResult<bool> {
        self.apply_transition(id, JobTransition::Cancel, None)
    }

    fn mark_queued(&self, id: &str) -> StorageResult<bool> {
        self.apply_transition(id, JobTransition::Rerun, None)
    }

    fn requeue_interrupted(&self, id: &str) -> StorageResult<bool> {
        self.apply_transition(id, JobTransition::Recover, None)
    }

    fn recover_interrupted(&self) -> StorageResult<u64> {
        let transition = JobTransition::Recover;
        let changed = self.conn()?.execute(
            &format!(
                "UPDATE jobs SET status = ?1, updated_at = ?2 WHERE status IN ({})",
                status_list(transition.sources())
            ),
            params![transition.target().to_db_string(), Utc::now()],
        )?;
        Ok(changed as u64)
    }
}

/// ORDER BY terms; column names come only from `SortColumn`
fn order_by(sort: Option<JobSort>) -> String {
    match sort {
        Some(sort) => format!(
            "{} {}, rowid {}",
            sort.column.as_sql(),
            sort.order.as_sql(),
            sort.order.as_sql()
        ),
        // Active jobs first, then most recently touched
        None => format!(
            "CASE WHEN status IN ({}) THEN 0 ELSE 1 END, updated_at DESC, rowid DESC",
            status_list(&[JobStatus::Queued, JobStatus::Processing])
        ),
    }
}

/// Renders statuses as a quoted SQL list, e.g. `'queued', 'processing'`
fn status_list(statuses: &[JobStatus]) -> String {
    statuses
        .iter()
        .map(|s| format!("'{}'", s.to_db_string()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Raw column values of one `jobs` row
struct JobRow {
    id: String,
    url: String,
    status: String,
    html_version: Option<String>,
    title: String,
    headings: String,
    internal_links: u32,
    external_links: u32,
    broken_links: String,
    has_login_form: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            url: row.get(1)?,
            status: row.get(2)?,
            html_version: row.get(3)?,
            title: row.get(4)?,
            headings: row.get(5)?,
            internal_links: row.get(6)?,
            external_links: row.get(7)?,
            broken_links: row.get(8)?,
            has_login_form: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
            completed_at: row.get(12)?,
        })
    }

    fn into_job(self) -> StorageResult<AnalysisJob> {
        let status =
            JobStatus::from_db_string(&self.status).ok_or_else(|| StorageError::CorruptRow {
                id: self.id.clone(),
                message: format!("unknown status '{}'", self.status),
            })?;

        let html_version = match self.html_version.as_deref() {
            None => None,
            Some(label) => Some(HtmlVersion::from_label(label).ok_or_else(|| {
                StorageError::CorruptRow {
                    id: self.id.clone(),
                    message: format!("unknown html version '{}'", label),
                }
            })?),
        };

        Ok(AnalysisJob {
            status,
            result: AnalysisResult {
                html_version,
                title: self.title,
                headings: serde_json::from_str(&self.headings)?,
                internal_links: self.internal_links,
                external_links: self.external_links,
                broken_links: serde_json::from_str(&self.broken_links)?,
                has_login_form: self.has_login_form,
            },
            id: self.id,
            url: self.url,
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at: self.completed_at,
        })
    }
}
