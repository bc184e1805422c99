//! Storage traits and error types
//!
//! This module defines the job store contract consumed by the worker and the
//! control layer, and the associated error types.

use crate::state::{AnalysisJob, AnalysisResult, JobStatus};
use crate::storage::{JobPage, JobQuery, StatusCounts};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt row for job {id}: {message}")]
    CorruptRow { id: String, message: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence contract for analysis jobs
///
/// Every `mark_*` method is a compare-and-set: it only changes the row when the
/// current status is a valid source for the transition, and returns whether a
/// row was changed. A `false` return is not an error; it means a concurrent
/// operation (or a deletion) got there first.
pub trait JobStore: Send + Sync {
    // ===== Request-side Operations =====

    /// Inserts a new queued job for `url`
    fn insert_job(&self, url: &str) -> StorageResult<AnalysisJob>;

    /// Gets a job by id
    fn get_job(&self, id: &str) -> StorageResult<Option<AnalysisJob>>;

    /// Lists jobs with filtering and pagination
    fn list_jobs(&self, query: &JobQuery) -> StorageResult<JobPage>;

    /// Counts jobs per status
    fn count_by_status(&self) -> StorageResult<StatusCounts>;

    /// Deletes jobs by id, returning how many rows were removed
    fn delete_jobs(&self, ids: &[String]) -> StorageResult<u64>;

    // ===== Worker-side Operations =====

    /// Returns some queued job (oldest first), without claiming it
    fn fetch_next_queued(&self) -> StorageResult<Option<AnalysisJob>>;

    /// Queued -> Processing
    fn mark_processing(&self, id: &str) -> StorageResult<bool>;

    /// Processing -> Completed, storing the result and `completed_at`
    fn mark_completed(&self, id: &str, result: &AnalysisResult) -> StorageResult<bool>;

    /// Processing -> Failed, clearing result fields
    fn mark_failed(&self, id: &str) -> StorageResult<bool>;

    /// Queued | Processing -> Cancelled, clearing result fields
    fn mark_cancelled(&self, id: &str) -> StorageResult<bool>;

    /// Completed | Failed | Cancelled -> Queued, keeping previous results
    fn mark_queued(&self, id: &str) -> StorageResult<bool>;

    /// Processing -> Queued for one job whose analysis never got under way
    fn requeue_interrupted(&self, id: &str) -> StorageResult<bool>;

    /// Returns every Processing job to Queued (start-up crash recovery)
    fn recover_interrupted(&self) -> StorageResult<u64>;

    /// Convenience for reading just the status of a job
    fn get_status(&self, id: &str) -> StorageResult<Option<JobStatus>> {
        Ok(self.get_job(id)?.map(|job| job.status))
    }
}
