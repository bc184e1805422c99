//! Request-side job operations: submit, inspect, delete, stop and rerun
//!
//! These are the operations a front end calls while the worker runs. Every
//! status change goes through the store's compare-and-set, so they never
//! clobber a transition the worker recorded concurrently.

use crate::jobs::CancellationRegistry;
use crate::state::{AnalysisJob, JobStatus, JobTransition};
use crate::storage::{JobPage, JobQuery, JobStore, StorageError};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Errors returned by job control operations
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Invalid URL '{0}': must be an absolute http(s) URL with a host")]
    InvalidUrl(String),

    #[error("Invalid job id '{0}'")]
    InvalidId(String),

    #[error("No job ids given")]
    NoIds,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type ControlResult<T> = Result<T, ControlError>;

/// Checks that `raw` is an absolute http(s) URL with a usable host
pub fn validate_url(raw: &str) -> ControlResult<Url> {
    let invalid = || ControlError::InvalidUrl(raw.to_string());

    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid());
    }
    match url.host_str() {
        Some(host) if !host.is_empty() && !host.contains(' ') => Ok(url),
        _ => Err(invalid()),
    }
}

/// Checks that every id is a UUID and that at least one was given
pub fn validate_ids(ids: &[String]) -> ControlResult<()> {
    if ids.is_empty() {
        return Err(ControlError::NoIds);
    }
    for id in ids {
        validate_id(id)?;
    }
    Ok(())
}

fn validate_id(id: &str) -> ControlResult<()> {
    uuid::Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| ControlError::InvalidId(id.to_string()))
}

/// Job operations over a shared store and cancellation registry
pub struct JobControl<S: JobStore> {
    store: Arc<S>,
    registry: CancellationRegistry,
}

impl<S: JobStore> Clone for JobControl<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: self.registry.clone(),
        }
    }
}

impl<S: JobStore> JobControl<S> {
    pub fn new(store: Arc<S>, registry: CancellationRegistry) -> Self {
        Self { store, registry }
    }

    /// Queues a new analysis of `url`
    pub fn submit(&self, url: &str) -> ControlResult<AnalysisJob> {
        validate_url(url)?;
        let job = self.store.insert_job(url.trim())?;
        tracing::info!("Queued job {} for {}", job.id, job.url);
        Ok(job)
    }

    pub fn get(&self, id: &str) -> ControlResult<Option<AnalysisJob>> {
        validate_id(id)?;
        Ok(self.store.get_job(id)?)
    }

    pub fn list(&self, query: &JobQuery) -> ControlResult<JobPage> {
        Ok(self.store.list_jobs(query)?)
    }

    /// Deletes jobs, signalling any that are being analyzed
    ///
    /// Returns how many rows were removed.
    pub fn delete(&self, ids: &[String]) -> ControlResult<u64> {
        validate_ids(ids)?;
        for id in ids {
            self.registry.stop(id);
        }
        let deleted = self.store.delete_jobs(ids)?;
        tracing::info!("Deleted {} of {} jobs", deleted, ids.len());
        Ok(deleted)
    }

    /// Cancels queued or processing jobs
    ///
    /// The cancelled status is recorded first, then the in-flight analysis (if
    /// any) is signalled. Returns how many rows changed; jobs already in a
    /// terminal status are left alone.
    pub fn stop(&self, ids: &[String]) -> ControlResult<u64> {
        validate_ids(ids)?;
        let mut stopped = 0;
        for id in ids {
            if self.store.mark_cancelled(id)? {
                stopped += 1;
            }
            self.registry.stop(id);
        }
        tracing::info!("Stopped {} of {} jobs", stopped, ids.len());
        Ok(stopped)
    }

    /// Re-queues finished jobs
    ///
    /// Only Completed, Failed and Cancelled jobs are re-queued; their previous
    /// results stay visible until the next analysis completes. Returns how many
    /// rows changed.
    pub fn rerun(&self, ids: &[String]) -> ControlResult<u64> {
        validate_ids(ids)?;
        let mut requeued = 0;
        for id in ids {
            let Some(status) = self.store.get_status(id)? else {
                continue;
            };
            if let Err(e) = status.apply(JobTransition::Rerun) {
                tracing::debug!("Not re-running job {}: {}", id, e);
                continue;
            }
            if self.store.mark_queued(id)? {
                requeued += 1;
            }
        }
        tracing::info!("Re-queued {} of {} jobs", requeued, ids.len());
        Ok(requeued)
    }

    /// Current status of a job, if it exists
    pub fn status(&self, id: &str) -> ControlResult<Option<JobStatus>> {
        validate_id(id)?;
        Ok(self.store.get_status(id)?)
    }
}
