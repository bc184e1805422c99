//! Cancellation registry for in-flight analyses

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// Job id to (registration number, token)
type TokenMap = HashMap<String, (u64, CancellationToken)>;

/// Tracks the cancellation token of every job between claim and terminal status
///
/// Cloning is cheap; all clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct CancellationRegistry {
    tokens: Arc<Mutex<TokenMap>>,
    next_registration: Arc<AtomicU64>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Map operations never panic halfway, so a poisoned map is still consistent
    fn tokens(&self) -> MutexGuard<'_, TokenMap> {
        self.tokens
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a fresh token for `job_id`
    ///
    /// The returned guard unregisters the job when dropped, whether the
    /// analysis finished, failed, was cancelled or panicked.
    pub fn register(&self, job_id: &str) -> RegistrationGuard {
        let token = CancellationToken::new();
        let registration = self.next_registration.fetch_add(1, Ordering::Relaxed);
        let previous = self
            .tokens()
            .insert(job_id.to_string(), (registration, token.clone()));
        if previous.is_some() {
            tracing::warn!("Job {} was already registered, replacing its token", job_id);
        }

        RegistrationGuard {
            registry: self.clone(),
            job_id: job_id.to_string(),
            registration,
            token,
        }
    }

    /// Signals the token registered under `job_id`
    ///
    /// Returns whether a token was found. Stopping an unknown id is a no-op.
    pub fn stop(&self, job_id: &str) -> bool {
        match self.tokens().get(job_id) {
            Some((_, token)) => {
                token.cancel();
                tracing::info!("Cancellation requested for job {}", job_id);
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self, job_id: &str) -> bool {
        self.tokens().contains_key(job_id)
    }

    /// Number of registered jobs
    pub fn len(&self) -> usize {
        self.tokens().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn unregister(&self, job_id: &str, registration: u64) {
        let mut tokens = self.tokens();
        // Only remove our own entry, never a newer registration for the same id
        if tokens
            .get(job_id)
            .is_some_and(|(current, _)| *current == registration)
        {
            tokens.remove(job_id);
        }
    }
}

/// Keeps a job registered while it is alive
#[derive(Debug)]
pub struct RegistrationGuard {
    registry: CancellationRegistry,
    job_id: String,
    registration: u64,
    token: CancellationToken,
}

impl RegistrationGuard {
    /// The token the analyzer should poll
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        self.registry.unregister(&self.job_id, self.registration);
    }
}
