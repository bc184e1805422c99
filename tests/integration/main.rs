//! Integration tests for page-inspector
//!
//! These tests use wiremock to create mock HTTP servers and drive the
//! analyzer and the worker end-to-end against an in-memory store.

mod analyzer_tests;
mod common;
mod config_tests;
mod worker_tests;
