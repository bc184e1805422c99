//! Page analysis
//!
//! This module turns one URL into an [`AnalysisResult`]:
//! - `fetcher`: HTTP clients and the page GET
//! - `parser`: doctype, title, headings, login form and hrefs
//! - `links`: link classification and broken-link probes
//!
//! Every step honours a [`CancellationToken`]. Cancellation is cooperative: it
//! is observed at checkpoints between steps, never in the middle of a request.

mod fetcher;
mod links;
mod parser;

pub use fetcher::{build_page_client, build_probe_client, fetch_page, FetchedPage};
pub use links::{
    classify_href, is_broken_status, ClassifiedLink, LinkProber, LinkReport, LinkScope,
    ProbeOutcome, BOT_PROTECTION_STATUS,
};
pub use parser::{
    count_headings, detect_html_version, extract_hrefs, extract_title, has_login_form,
    inspect_document, InspectedPage, HEADING_TAGS,
};

use crate::config::{Config, FetchConfig, UserAgentConfig};
use crate::state::AnalysisResult;
use crate::AnalysisError;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Returns `Cancelled` if cancellation has been requested
pub(crate) fn checkpoint(token: &CancellationToken) -> Result<(), AnalysisError> {
    if token.is_cancelled() {
        Err(AnalysisError::Cancelled)
    } else {
        Ok(())
    }
}

/// Fetches and analyzes single pages
#[derive(Debug, Clone)]
pub struct Analyzer {
    page_client: Client,
    prober: LinkProber,
}

impl Analyzer {
    pub fn new(fetch: &FetchConfig, user_agent: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            page_client: build_page_client(fetch, user_agent)?,
            prober: LinkProber::new(build_probe_client(fetch, user_agent)?),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(&config.fetch, &config.user_agent)
    }

    /// Analyzes the page at `url`
    ///
    /// # Returns
    ///
    /// * `Ok(AnalysisResult)` - Page fetched and fully analyzed
    /// * `Err(AnalysisError::Cancelled)` - `token` was cancelled at a checkpoint
    /// * `Err(_)` - Any other failure; the job should be marked failed
    pub async fn analyze(
        &self,
        url: &str,
        token: &CancellationToken,
    ) -> Result<AnalysisResult, AnalysisError> {
        checkpoint(token)?;

        let target = Url::parse(url).map_err(|e| AnalysisError::Parse {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let page = fetch_page(&self.page_client, &target).await?;
        checkpoint(token)?;

        let inspected = inspect_document(&page.body, token)?;
        tracing::debug!(
            "{}: {} ({} hrefs)",
            target,
            inspected.html_version,
            inspected.hrefs.len()
        );

        // Links resolve against the submitted URL, not the post-redirect one
        let links = self
            .prober
            .check_links(&inspected.hrefs, &target, token)
            .await?;
        checkpoint(token)?;

        Ok(AnalysisResult {
            html_version: Some(inspected.html_version),
            title: inspected.title,
            headings: inspected.headings,
            internal_links: links.internal,
            external_links: links.external,
            broken_links: links.broken,
            has_login_form: inspected.has_login_form,
        })
    }
}
