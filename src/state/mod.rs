//! State module for analysis jobs
//!
//! # Components
//!
//! - `JobStatus` / `JobTransition`: the job lifecycle and its transition table
//! - `AnalysisJob` / `AnalysisResult`: the persisted job record and its metrics

mod job;
mod job_status;

// Re-export main types
pub use job::{
    AnalysisJob, AnalysisResult, BrokenLinks, HeadingCounts, HtmlVersion, BROKEN_LABEL,
};
pub use job_status::{JobStatus, JobTransition, TransitionError};
