//! Analysis job record and its result fields

use crate::state::JobStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Heading tag ("h1".."h6") to number of occurrences
pub type HeadingCounts = BTreeMap<String, u32>;

/// Broken link URL to status label
pub type BrokenLinks = BTreeMap<String, String>;

/// Label recorded for every broken link
pub const BROKEN_LABEL: &str = "Broken";

/// Detected markup flavour of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HtmlVersion {
    #[serde(rename = "HTML5")]
    Html5,
    #[serde(rename = "XHTML")]
    Xhtml,
    #[serde(rename = "HTML 4.01")]
    Html401,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl HtmlVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html5 => "HTML5",
            Self::Xhtml => "XHTML",
            Self::Html401 => "HTML 4.01",
            Self::Unknown => "Unknown",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "HTML5" => Some(Self::Html5),
            "XHTML" => Some(Self::Xhtml),
            "HTML 4.01" => Some(Self::Html401),
            "Unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for HtmlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural metrics computed for one page
///
/// The `Default` value is the "empty" result every non-completed job carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub html_version: Option<HtmlVersion>,
    pub title: String,
    pub headings: HeadingCounts,
    pub internal_links: u32,
    pub external_links: u32,
    pub broken_links: BrokenLinks,
    pub has_login_form: bool,
}

impl AnalysisResult {
    /// Returns true when every result field is empty or zero
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A submitted URL and the outcome of analyzing it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub id: String,
    pub url: String,
    pub status: JobStatus,
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AnalysisJob {
    /// Creates a freshly queued job with a new UUID
    pub fn new_queued(url: &str) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: url.to_string(),
            status: JobStatus::Queued,
            result: AnalysisResult::default(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}
