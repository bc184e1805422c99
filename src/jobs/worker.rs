//! Background worker that claims queued jobs and analyzes them one at a time

use crate::analyzer::Analyzer;
use crate::config::WorkerConfig;
use crate::jobs::CancellationRegistry;
use crate::state::{AnalysisResult, JobStatus};
use crate::storage::{JobStore, StorageError, StorageResult};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What a single worker iteration did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// No queued job was available
    Idle,

    /// A queued job was found but not processed (stopped, deleted, or
    /// claimed by someone else in the meantime)
    Skipped { id: String },

    /// A job was analyzed
    Processed {
        id: String,
        /// Terminal status the worker attempted to record
        status: JobStatus,
        /// False when a concurrent stop or delete won the race
        applied: bool,
    },
}

/// Write owed to a claimed job
#[derive(Debug)]
enum Outcome {
    /// The claim could not be confirmed; analysis never started
    Requeue,
    Complete(AnalysisResult),
    Cancel,
    Fail,
}

impl Outcome {
    fn status(&self) -> JobStatus {
        match self {
            Self::Requeue => JobStatus::Queued,
            Self::Complete(_) => JobStatus::Completed,
            Self::Cancel => JobStatus::Cancelled,
            Self::Fail => JobStatus::Failed,
        }
    }
}

/// A claimed job whose final write hit a store error
#[derive(Debug)]
struct Stranded {
    id: String,
    outcome: Outcome,
}

/// The single job worker
pub struct Worker<S: JobStore> {
    store: Arc<S>,
    analyzer: Analyzer,
    registry: CancellationRegistry,
    config: WorkerConfig,
    stranded: Mutex<Option<Stranded>>,
}

impl<S: JobStore> Worker<S> {
    pub fn new(
        store: Arc<S>,
        analyzer: Analyzer,
        registry: CancellationRegistry,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            analyzer,
            registry,
            config,
            stranded: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &CancellationRegistry {
        &self.registry
    }

    /// Runs until `shutdown` is cancelled
    ///
    /// Shutdown is observed between iterations; a job being analyzed is
    /// finished first.
    pub async fn run(&self, shutdown: CancellationToken) {
        match self.store.recover_interrupted() {
            Ok(0) => {}
            Ok(count) => tracing::info!("Re-queued {} jobs interrupted by a previous run", count),
            Err(e) => tracing::error!("Failed to recover interrupted jobs: {}", e),
        }

        tracing::info!(
            "Worker started (poll every {}ms, throttle {}ms)",
            self.config.poll_interval_ms,
            self.config.throttle_ms
        );

        while !shutdown.is_cancelled() {
            let pause = match self.tick().await {
                Ok(Tick::Idle) => self.config.poll_interval(),
                Ok(Tick::Skipped { .. }) => Duration::ZERO,
                Ok(Tick::Processed { .. }) => self.config.throttle(),
                Err(e) => {
                    tracing::error!("Worker iteration failed: {}", e);
                    self.config.poll_interval()
                }
            };

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        tracing::info!("Worker stopped");
    }

    /// Performs one iteration: claim, analyze and record one job
    ///
    /// A claimed job is never abandoned in `Processing`: when its final write
    /// fails, the write is retried at the start of the next call, and no new
    /// job is claimed until it succeeds.
    ///
    /// # Returns
    ///
    /// * `Ok(Tick)` - What happened
    /// * `Err(StorageError)` - The store failed
    pub async fn tick(&self) -> StorageResult<Tick> {
        self.settle_stranded()?;

        let Some(candidate) = self.store.fetch_next_queued()? else {
            return Ok(Tick::Idle);
        };
        let id = candidate.id;

        // A stop or delete may have landed since the fetch
        let job = match self.store.get_job(&id)? {
            Some(job) if job.status == JobStatus::Queued => job,
            Some(job) => {
                tracing::info!("Skipping job {}: now {}", id, job.status);
                return Ok(Tick::Skipped { id });
            }
            None => {
                tracing::info!("Skipping job {}: deleted", id);
                return Ok(Tick::Skipped { id });
            }
        };

        if !self.store.mark_processing(&id)? {
            tracing::info!("Skipping job {}: claim not applied", id);
            return Ok(Tick::Skipped { id });
        }

        tracing::info!("Processing job {} ({})", id, job.url);

        let analysis = {
            let guard = self.registry.register(&id);
            match self.store.get_status(&id) {
                Ok(Some(JobStatus::Processing)) => {}
                // A stop between the claim and the registration found no token
                Ok(_) => guard.token().cancel(),
                Err(e) => return Err(self.strand(id, Outcome::Requeue, e)),
            }
            self.analyzer.analyze(&job.url, guard.token()).await
        };

        let outcome = match analysis {
            Ok(result) => {
                tracing::info!(
                    "Completed job {}: {} internal, {} external, {} broken links",
                    id,
                    result.internal_links,
                    result.external_links,
                    result.broken_links.len()
                );
                Outcome::Complete(result)
            }
            Err(e) if e.is_cancelled() => {
                tracing::info!("Job {} cancelled", id);
                Outcome::Cancel
            }
            Err(e) => {
                tracing::warn!("Job {} failed: {}", id, e);
                Outcome::Fail
            }
        };

        let status = outcome.status();
        let applied = match self.record(&id, &outcome) {
            Ok(applied) => applied,
            Err(e) => return Err(self.strand(id, outcome, e)),
        };
        if !applied {
            self.log_not_applied(&id, status);
        }

        Ok(Tick::Processed {
            id,
            status,
            applied,
        })
    }

    fn record(&self, id: &str, outcome: &Outcome) -> StorageResult<bool> {
        match outcome {
            Outcome::Requeue => self.store.requeue_interrupted(id),
            Outcome::Complete(result) => self.store.mark_completed(id, result),
            Outcome::Cancel => self.store.mark_cancelled(id),
            Outcome::Fail => self.store.mark_failed(id),
        }
    }

    fn stranded(&self) -> MutexGuard<'_, Option<Stranded>> {
        self.stranded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Keeps the write owed to a claimed job for the next iteration
    fn strand(&self, id: String, outcome: Outcome, error: StorageError) -> StorageError {
        tracing::error!(
            "Store error while recording {} for job {}: {}; retrying next iteration",
            outcome.status(),
            id,
            error
        );
        *self.stranded() = Some(Stranded { id, outcome });
        error
    }

    /// Retries a write left over from a previous iteration
    fn settle_stranded(&self) -> StorageResult<()> {
        let mut stranded = self.stranded();
        let Some(pending) = stranded.as_ref() else {
            return Ok(());
        };

        let status = pending.outcome.status();
        if self.record(&pending.id, &pending.outcome)? {
            tracing::info!("Recorded {} for job {} on retry", status, pending.id);
        } else {
            self.log_not_applied(&pending.id, status);
        }
        *stranded = None;
        Ok(())
    }

    fn log_not_applied(&self, id: &str, status: JobStatus) {
        match self.store.get_status(id) {
            // The stop request already recorded the cancellation
            Ok(Some(JobStatus::Cancelled)) if status == JobStatus::Cancelled => {}
            Ok(Some(current)) => {
                tracing::info!("Job {} is {}; not recording {}", id, current, status)
            }
            Ok(None) => tracing::info!("Job {} was deleted during analysis", id),
            Err(e) => tracing::warn!("Job {}: {} not recorded ({})", id, status, e),
        }
    }
}
