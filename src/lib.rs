//! page-inspector: asynchronous structural analysis of submitted web pages
//!
//! Submitted URLs become queued jobs in a SQLite store. A single background
//! worker claims them one at a time, fetches and parses the page, probes its
//! links and records the outcome. Jobs can be stopped cooperatively while they
//! are analyzed.

pub mod analyzer;
pub mod config;
pub mod jobs;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for page-inspector operations
#[derive(Debug, Error)]
pub enum InspectorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Job control error: {0}")]
    Control(#[from] jobs::ControlError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Outcome of a page analysis that did not produce a result
///
/// Every variant except `Cancelled` sends the job to `Failed`.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Transport error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("Too many redirects from {url}")]
    TooManyRedirects { url: String },

    #[error("Non-success status {status} from {url}")]
    NonSuccessStatus { url: String, status: u16 },

    #[error("Parse error for {url}: {message}")]
    Parse { url: String, message: String },
}

impl AnalysisError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Terminal job status this error maps to
    pub fn job_status(&self) -> state::JobStatus {
        if self.is_cancelled() {
            state::JobStatus::Cancelled
        } else {
            state::JobStatus::Failed
        }
    }
}

/// Result type alias for page-inspector operations
pub type Result<T> = std::result::Result<T, InspectorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use analyzer::Analyzer;
pub use config::Config;
pub use jobs::{CancellationRegistry, JobControl, Worker};
pub use state::{AnalysisJob, AnalysisResult, JobStatus};
pub use storage::{JobStore, SqliteStorage};
