//! Link classification and broken-link probing

use crate::analyzer::checkpoint;
use crate::state::{BrokenLinks, BROKEN_LABEL};
use crate::AnalysisError;
use reqwest::Client;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Status some sites return to suspected bots; the link itself is fine
pub const BOT_PROTECTION_STATUS: u16 = 999;

/// Schemes skipped before resolution
const SKIPPED_PREFIXES: [&str; 4] = ["javascript:", "mailto:", "tel:", "ftp:"];

/// Whether a link stays on the analyzed site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkScope {
    Internal,
    External,
}

/// A resolved, countable link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLink {
    pub url: Url,
    pub scope: LinkScope,
}

/// Result of probing one link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable(u16),
    Broken,
}

/// Output of the link pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkReport {
    pub internal: u32,
    pub external: u32,
    pub broken: BrokenLinks,
}

/// Resolves `href` against `base` and classifies it
///
/// Returns None for links that are not counted:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel:, ftp: hrefs
/// - anything that does not resolve to an http(s) URL
pub fn classify_href(href: &str, base: &Url) -> Option<ClassifiedLink> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if SKIPPED_PREFIXES.iter().any(|p| href.starts_with(p)) {
        return None;
    }

    let url = base.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    let scope = if same_host(&url, base) {
        LinkScope::Internal
    } else {
        LinkScope::External
    };

    Some(ClassifiedLink { url, scope })
}

/// Host (case-insensitive) and explicit port must both match
fn same_host(url: &Url, base: &Url) -> bool {
    let host = |u: &Url| u.host_str().map(str::to_ascii_lowercase);
    host(url) == host(base) && url.port() == base.port()
}

/// Whether a final probe status marks a link as broken
pub fn is_broken_status(status: u16) -> bool {
    status != BOT_PROTECTION_STATUS && (400..=599).contains(&status)
}

/// Probes links for reachability
#[derive(Debug, Clone)]
pub struct LinkProber {
    client: Client,
}

impl LinkProber {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Counts and probes every qualifying href
    ///
    /// Every occurrence is counted, but each absolute URL is probed at most
    /// once. Cancellation is checked before each probe.
    pub async fn check_links(
        &self,
        hrefs: &[String],
        base: &Url,
        token: &CancellationToken,
    ) -> Result<LinkReport, AnalysisError> {
        let mut report = LinkReport::default();
        let mut probed = HashSet::new();

        for href in hrefs {
            let Some(link) = classify_href(href, base) else {
                continue;
            };

            match link.scope {
                LinkScope::Internal => report.internal += 1,
                LinkScope::External => report.external += 1,
            }

            let key = link.url.to_string();
            if !probed.insert(key.clone()) {
                continue;
            }

            checkpoint(token)?;
            if self.probe(&link.url).await == ProbeOutcome::Broken {
                report.broken.insert(key, BROKEN_LABEL.to_string());
            }
        }

        tracing::debug!(
            "{}: {} internal, {} external, {} broken of {} probed",
            base,
            report.internal,
            report.external,
            report.broken.len(),
            probed.len()
        );

        Ok(report)
    }

    /// HEAD, falling back to GET once when HEAD fails outright
    pub async fn probe(&self, url: &Url) -> ProbeOutcome {
        let response = match self.client.head(url.clone()).send().await {
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::trace!("HEAD {} failed ({}), retrying with GET", url, e);
                self.client.get(url.clone()).send().await
            }
        };

        match response {
            Ok(response) => {
                let status = response.status().as_u16();
                if is_broken_status(status) {
                    ProbeOutcome::Broken
                } else {
                    ProbeOutcome::Reachable(status)
                }
            }
            Err(e) => {
                tracing::debug!("Probe of {} failed: {}", url, e);
                ProbeOutcome::Broken
            }
        }
    }
}
