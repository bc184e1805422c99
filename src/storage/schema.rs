//! Database schema definitions
//!
//! This module contains the SQL schema for the page-inspector database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per submitted URL
CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    status TEXT NOT NULL,
    html_version TEXT,
    title TEXT NOT NULL DEFAULT '',
    headings TEXT NOT NULL DEFAULT '{}',
    internal_links INTEGER NOT NULL DEFAULT 0,
    external_links INTEGER NOT NULL DEFAULT 0,
    broken_links TEXT NOT NULL DEFAULT '{}',
    has_login_form INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    completed_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at);
"#;

/// Column list shared by every SELECT that builds an `AnalysisJob`
pub const JOB_COLUMNS: &str = "id, url, status, html_version, title, headings, internal_links,
     external_links, broken_links, has_login_form, created_at, updated_at, completed_at";

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Gets the current schema version
pub fn get_schema_version() -> u32 {
    1
}
