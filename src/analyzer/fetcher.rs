//! HTTP fetcher implementation
//!
//! This module handles the HTTP side of an analysis:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to fetch the analyzed page
//! - Redirect caps and error classification

use crate::config::{FetchConfig, UserAgentConfig};
use crate::AnalysisError;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;
use url::Url;

/// A successfully fetched page
#[derive(Debug)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,
    /// Page body content
    pub body: String,
}

/// Builds the client used to fetch the analyzed page
///
/// # Arguments
///
/// * `fetch` - Timeout and redirect limits
/// * `user_agent` - The user agent configuration
///
/// # Example
///
/// ```no_run
/// use page_inspector::analyzer::build_page_client;
/// use page_inspector::config::{FetchConfig, UserAgentConfig};
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "PageInspector".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_page_client(&FetchConfig::default(), &user_agent).unwrap();
/// ```
pub fn build_page_client(
    fetch: &FetchConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    build_client(
        user_agent,
        fetch.page_timeout(),
        fetch.page_max_redirects,
    )
}

/// Builds the client used for link probes
pub fn build_probe_client(
    fetch: &FetchConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    build_client(
        user_agent,
        fetch.probe_timeout(),
        fetch.probe_max_redirects,
    )
}

fn build_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
    max_redirects: usize,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .redirect(Policy::limited(max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches the page to analyze
///
/// | Condition | Outcome |
/// |-----------|---------|
/// | HTTP 200 | `Ok(FetchedPage)` |
/// | Any other status | `NonSuccessStatus` |
/// | Redirect chain over the cap | `TooManyRedirects` |
/// | Timeout, connection or body error | `Transport` |
pub async fn fetch_page(client: &Client, url: &Url) -> Result<FetchedPage, AnalysisError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| classify_error(url, e))?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(AnalysisError::NonSuccessStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let final_url = response.url().clone();
    if final_url != *url {
        tracing::debug!("{} redirected to {}", url, final_url);
    }

    let body = response
        .text()
        .await
        .map_err(|e| classify_error(url, e))?;

    Ok(FetchedPage { final_url, body })
}

fn classify_error(url: &Url, error: reqwest::Error) -> AnalysisError {
    if error.is_redirect() {
        AnalysisError::TooManyRedirects {
            url: url.to_string(),
        }
    } else {
        AnalysisError::Transport {
            url: url.to_string(),
            source: error,
        }
    }
}
