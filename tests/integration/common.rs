//! Shared fixtures for the integration tests

use page_inspector::config::{FetchConfig, UserAgentConfig, WorkerConfig};
use page_inspector::jobs::{CancellationRegistry, JobControl, Worker};
use page_inspector::storage::SqliteStorage;
use page_inspector::Analyzer;
use std::sync::Arc;

pub fn test_user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

/// Short timeouts so slow-link tests finish quickly
pub fn test_fetch_config() -> FetchConfig {
    FetchConfig {
        page_timeout_ms: 3_000,
        page_max_redirects: 3,
        probe_timeout_ms: 300,
        probe_max_redirects: 3,
    }
}

pub fn test_analyzer() -> Analyzer {
    Analyzer::new(&test_fetch_config(), &test_user_agent()).expect("Failed to build analyzer")
}

pub fn test_worker_config() -> WorkerConfig {
    WorkerConfig {
        poll_interval_ms: 20,
        throttle_ms: 1,
    }
}

/// A worker and a control handle sharing one in-memory store
pub struct Harness {
    pub store: Arc<SqliteStorage>,
    pub worker: Arc<Worker<SqliteStorage>>,
    pub control: JobControl<SqliteStorage>,
    pub registry: CancellationRegistry,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_fetch_config(test_fetch_config())
    }

    pub fn with_fetch_config(fetch: FetchConfig) -> Self {
        let store = Arc::new(SqliteStorage::new_in_memory().expect("Failed to open store"));
        let registry = CancellationRegistry::new();
        let worker = Worker::new(
            Arc::clone(&store),
            Analyzer::new(&fetch, &test_user_agent()).expect("Failed to build analyzer"),
            registry.clone(),
            test_worker_config(),
        );
        let control = JobControl::new(Arc::clone(&store), registry.clone());

        Self {
            store,
            worker: Arc::new(worker),
            control,
            registry,
        }
    }
}

/// Wraps body markup in a minimal HTML5 document
pub fn html5_page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>{}</title></head><body>{}</body></html>",
        title, body
    )
}
