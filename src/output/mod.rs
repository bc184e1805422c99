//! Output module for presenting jobs
//!
//! This module handles:
//! - Rendering jobs as JSON for a request layer or scripts
//! - Plain-text job details and listings for the console
//! - Job statistics

pub mod stats;

pub use stats::{format_statistics, load_statistics, print_statistics, JobStatistics};

use crate::state::AnalysisJob;
use crate::storage::JobPage;
use std::fmt::Write;

/// Renders a job in its serialized JSON shape
pub fn render_job_json(job: &AnalysisJob) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(job)
}

/// How a single job is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobFormat {
    #[default]
    Text,
    Json,
}

/// Renders a job in the chosen format
pub fn render_job(job: &AnalysisJob, format: JobFormat) -> Result<String, serde_json::Error> {
    match format {
        JobFormat::Text => Ok(format_job(job)),
        JobFormat::Json => render_job_json(job).map(|json| json + "\n"),
    }
}

/// Formats a single job with its result fields
pub fn format_job(job: &AnalysisJob) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Job {}", job.id);
    let _ = writeln!(out, "  URL:          {}", job.url);
    let _ = writeln!(out, "  Status:       {}", job.status);
    let _ = writeln!(out, "  Created:      {}", job.created_at.to_rfc3339());
    let _ = writeln!(out, "  Updated:      {}", job.updated_at.to_rfc3339());
    if let Some(completed_at) = job.completed_at {
        let _ = writeln!(out, "  Completed:    {}", completed_at.to_rfc3339());
    }

    let result = &job.result;
    if result.is_empty() {
        return out;
    }

    if let Some(version) = result.html_version {
        let _ = writeln!(out, "  HTML version: {}", version);
    }
    let _ = writeln!(out, "  Title:        {}", result.title);
    let headings = result
        .headings
        .iter()
        .map(|(tag, count)| format!("{}={}", tag, count))
        .collect::<Vec<_>>()
        .join(" ");
    let _ = writeln!(out, "  Headings:     {}", headings);
    let _ = writeln!(
        out,
        "  Links:        {} internal, {} external",
        result.internal_links, result.external_links
    );
    let _ = writeln!(out, "  Login form:   {}", result.has_login_form);
    let _ = writeln!(out, "  Broken links: {}", result.broken_links.len());
    for (url, label) in &result.broken_links {
        let _ = writeln!(out, "    {} ({})", url, label);
    }

    out
}

/// Formats one page of a listing as a table
pub fn format_job_page(page: &JobPage) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{:<36}  {:<10}  {:<25}  URL", "ID", "STATUS", "UPDATED");
    for job in &page.jobs {
        let _ = writeln!(
            out,
            "{:<36}  {:<10}  {:<25}  {}",
            job.id,
            job.status,
            job.updated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            job.url
        );
    }

    let counts = &page.status_counts;
    let _ = writeln!(
        out,
        "{} shown of {} matching | queued {} processing {} completed {} failed {} cancelled {}",
        page.jobs.len(),
        page.total_count,
        counts.queued,
        counts.processing,
        counts.completed,
        counts.failed,
        counts.cancelled
    );

    out
}

pub fn print_job(job: &AnalysisJob, format: JobFormat) -> Result<(), serde_json::Error> {
    print!("{}", render_job(job, format)?);
    Ok(())
}

pub fn print_job_page(page: &JobPage) {
    print!("{}", format_job_page(page));
}
