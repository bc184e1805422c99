//! Configuration files through to a working store and analyzer

use crate::common::{test_fetch_config, test_worker_config};
use page_inspector::config::{load_config_with_hash, parse_config};
use page_inspector::storage::{open_storage, JobStore};
use page_inspector::Analyzer;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_config_file_opens_store_and_analyzer() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("analyses.db");

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[fetch]
page-timeout-ms = 2000

[user-agent]
crawler-name = "PageInspector"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[storage]
database-path = "{}"
"#,
        db_path.display()
    )
    .unwrap();

    let (config, hash) = load_config_with_hash(file.path()).unwrap();
    assert_eq!(hash.len(), 64);
    assert_eq!(config.fetch.page_timeout_ms, 2000);
    assert_eq!(config.fetch.probe_timeout_ms, 5000);
    assert_eq!(config.worker.poll_interval_ms, 5000);

    assert!(Analyzer::from_config(&config).is_ok());

    let job_id = {
        let storage = open_storage(db_path.as_path()).unwrap();
        storage.insert_job("https://example.com/").unwrap().id
    };

    // Jobs survive reopening the database
    let storage = open_storage(db_path.as_path()).unwrap();
    assert!(storage.get_job(&job_id).unwrap().is_some());
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[fetch]
probe-max-redirects = 0

[user-agent]
crawler-name = "PageInspector"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[storage]
database-path = "./analyses.db"
"#
    )
    .unwrap();

    assert!(load_config_with_hash(file.path()).is_err());
}

#[test]
fn test_fixture_settings_pass_validation() {
    let worker = test_worker_config();
    let fetch = test_fetch_config();
    let content = format!(
        r#"
[worker]
poll-interval-ms = {}
throttle-ms = {}

[fetch]
page-timeout-ms = {}
page-max-redirects = {}
probe-timeout-ms = {}
probe-max-redirects = {}

[user-agent]
crawler-name = "PageInspector"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[storage]
database-path = "./analyses.db"
"#,
        worker.poll_interval_ms,
        worker.throttle_ms,
        fetch.page_timeout_ms,
        fetch.page_max_redirects,
        fetch.probe_timeout_ms,
        fetch.probe_max_redirects
    );

    let config = parse_config(&content).unwrap();
    assert_eq!(config.worker.throttle_ms, worker.throttle_ms);
    assert_eq!(config.fetch.probe_timeout_ms, fetch.probe_timeout_ms);
}
