//! Job status definitions and the transition table shared by the worker and
//! the control layer.
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle status of an analysis job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    // ===== Active States =====
    /// Job is waiting for the worker
    Queued,

    /// Job has been claimed and its page is being analyzed
    Processing,

    // ===== Terminal States =====
    /// Analysis finished and result fields are populated
    Completed,

    /// Analysis failed (transport, redirect, status or parse error)
    Failed,

    /// Job was stopped before or during analysis
    Cancelled,
}

/// A named edge of the job state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobTransition {
    /// Worker takes ownership of a queued job
    Claim,
    /// Analysis succeeded
    Complete,
    /// Analysis returned an error other than cancellation
    Fail,
    /// External stop request
    Cancel,
    /// External request to analyze a finished job again
    Rerun,
    /// Return of a processing job to the queue: at start-up, or when the
    /// worker could not confirm its claim
    Recover,
}

/// Rejected transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid transition {transition:?} from {from}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub transition: JobTransition,
}

impl JobTransition {
    /// Status a job ends in after this transition
    pub fn target(&self) -> JobStatus {
        match self {
            Self::Claim => JobStatus::Processing,
            Self::Complete => JobStatus::Completed,
            Self::Fail => JobStatus::Failed,
            Self::Cancel => JobStatus::Cancelled,
            Self::Rerun | Self::Recover => JobStatus::Queued,
        }
    }

    /// Statuses this transition may be applied from
    pub fn sources(&self) -> &'static [JobStatus] {
        match self {
            Self::Claim => &[JobStatus::Queued],
            Self::Complete | Self::Fail | Self::Recover => &[JobStatus::Processing],
            Self::Cancel => &[JobStatus::Queued, JobStatus::Processing],
            Self::Rerun => &[
                JobStatus::Completed,
                JobStatus::Failed,
                JobStatus::Cancelled,
            ],
        }
    }

    /// Whether result fields and `completed_at` are reset by this transition
    ///
    /// Rerun intentionally leaves the previous results in place until the job
    /// completes again.
    pub fn clears_results(&self) -> bool {
        matches!(self, Self::Fail | Self::Cancel)
    }
}

impl JobStatus {
    /// Returns true for Completed, Failed and Cancelled
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true while the job still awaits or undergoes analysis
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Processing)
    }

    pub fn can_cancel(&self) -> bool {
        JobTransition::Cancel.sources().contains(self)
    }

    pub fn can_rerun(&self) -> bool {
        JobTransition::Rerun.sources().contains(self)
    }

    /// Applies a transition, rejecting it when `self` is not a valid source
    pub fn apply(self, transition: JobTransition) -> Result<JobStatus, TransitionError> {
        if transition.sources().contains(&self) {
            Ok(transition.target())
        } else {
            Err(TransitionError {
                from: self,
                transition,
            })
        }
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns all statuses in lifecycle order
    pub fn all_states() -> [Self; 5] {
        [
            Self::Queued,
            Self::Processing,
            Self::Completed,
            Self::Failed,
            Self::Cancelled,
        ]
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.to_db_string())
    }
}
