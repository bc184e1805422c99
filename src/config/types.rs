use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for page-inspector
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
}

/// Worker loop pacing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Backoff when no queued job is available (milliseconds)
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// Pause after each processed job (milliseconds)
    #[serde(rename = "throttle-ms")]
    pub throttle_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            throttle_ms: 1_000,
        }
    }
}

impl WorkerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

/// HTTP limits for the page fetch and the link probes
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Timeout for fetching the analyzed page (milliseconds)
    #[serde(rename = "page-timeout-ms")]
    pub page_timeout_ms: u64,

    /// Maximum redirect hops when fetching the analyzed page
    #[serde(rename = "page-max-redirects")]
    pub page_max_redirects: usize,

    /// Timeout for each link probe (milliseconds)
    #[serde(rename = "probe-timeout-ms")]
    pub probe_timeout_ms: u64,

    /// Maximum redirect hops for a link probe
    #[serde(rename = "probe-max-redirects")]
    pub probe_max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_timeout_ms: 10_000,
            page_max_redirects: 10,
            probe_timeout_ms: 5_000,
            probe_max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}
