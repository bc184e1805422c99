//! Job statistics from the store
//!
//! This module provides functionality for extracting and displaying
//! per-status job counts.

use crate::state::JobStatus;
use crate::storage::{JobStore, StatusCounts, StorageResult};
use std::fmt::Write;

/// Job statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatistics {
    /// Total number of jobs in the store
    pub total_jobs: u64,

    /// Count of jobs by status
    pub counts: StatusCounts,
}

/// Loads statistics from storage
pub fn load_statistics(store: &dyn JobStore) -> StorageResult<JobStatistics> {
    let counts = store.count_by_status()?;
    Ok(JobStatistics {
        total_jobs: counts.total(),
        counts,
    })
}

/// Formats statistics as a plain-text report
pub fn format_statistics(stats: &JobStatistics) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Job Statistics ===\n");
    let _ = writeln!(out, "Total jobs: {}", stats.total_jobs);
    let _ = writeln!(out);
    let _ = writeln!(out, "Jobs by Status:");

    for status in JobStatus::all_states() {
        let count = stats.counts.get(status);
        let percentage = if stats.total_jobs > 0 {
            (count as f64 / stats.total_jobs as f64) * 100.0
        } else {
            0.0
        };
        let _ = writeln!(
            out,
            "  {:<10} {} ({:.1}%)",
            status.to_db_string(),
            count,
            percentage
        );
    }

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &JobStatistics) {
    print!("{}", format_statistics(stats));
}
