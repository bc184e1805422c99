//! HTML parser for extracting structural metrics
//!
//! This module handles parsing HTML content to extract:
//! - The HTML version implied by the doctype
//! - Page title and heading counts
//! - Login form presence
//! - Raw anchor hrefs for the link pass

use crate::analyzer::checkpoint;
use crate::state::{HeadingCounts, HtmlVersion};
use crate::AnalysisError;
use scraper::{Html, Node, Selector};
use tokio_util::sync::CancellationToken;

/// Heading levels counted on every page
pub const HEADING_TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// Substrings of a form's `action` or `class` that mark it as a login form
const LOGIN_MARKERS: [&str; 4] = ["login", "signin", "sign-in", "auth"];

/// Everything the analyzer needs from a parsed document
///
/// The parsed `Html` tree is not `Send`, so it never outlives the synchronous
/// inspection; only these owned values cross an await point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectedPage {
    pub html_version: HtmlVersion,
    pub title: String,
    pub headings: HeadingCounts,
    pub has_login_form: bool,
    /// Every `<a href>` value in document order
    pub hrefs: Vec<String>,
}

/// Parses `body` and extracts the page metrics
///
/// Cancellation is checked once per heading level.
pub fn inspect_document(
    body: &str,
    token: &CancellationToken,
) -> Result<InspectedPage, AnalysisError> {
    let document = Html::parse_document(body);

    let html_version = detect_html_version(&document);
    let title = extract_title(&document);
    let headings = count_headings(&document, token)?;
    let has_login_form = has_login_form(&document);
    let hrefs = extract_hrefs(&document);

    Ok(InspectedPage {
        html_version,
        title,
        headings,
        has_login_form,
        hrefs,
    })
}

/// Serializes the document with its doctype identifiers intact
///
/// The tree serializer only writes `<!DOCTYPE name>`, which would make every
/// XHTML and HTML 4.01 doctype look like HTML5.
fn serialize_with_doctype(document: &Html) -> String {
    let mut out = String::new();

    for child in document.tree.root().children() {
        if let Node::Doctype(doctype) = child.value() {
            out.push_str("<!DOCTYPE ");
            out.push_str(doctype.name());
            let public_id = doctype.public_id();
            let system_id = doctype.system_id();
            if !public_id.is_empty() {
                out.push_str(&format!(" PUBLIC \"{}\"", public_id));
                if !system_id.is_empty() {
                    out.push_str(&format!(" \"{}\"", system_id));
                }
            } else if !system_id.is_empty() {
                out.push_str(&format!(" SYSTEM \"{}\"", system_id));
            }
            out.push('>');
        }
    }

    out.push_str(&document.root_element().html());
    out
}

/// Detects the HTML version from the serialized markup
///
/// Checks run in order: an HTML5 doctype, then `xhtml`, then `html 4.01`, and
/// finally any root `<html>` element.
pub fn detect_html_version(document: &Html) -> HtmlVersion {
    let markup = serialize_with_doctype(document).to_lowercase();

    if markup.contains("<!doctype html>") {
        HtmlVersion::Html5
    } else if markup.contains("xhtml") {
        HtmlVersion::Xhtml
    } else if markup.contains("html 4.01") {
        HtmlVersion::Html401
    } else if markup.contains("<html") {
        HtmlVersion::Html5
    } else {
        HtmlVersion::Unknown
    }
}

/// Extracts the first `<title>`, trimmed, or an empty string
pub fn extract_title(document: &Html) -> String {
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Counts `h1`..`h6`, including levels with zero occurrences
pub fn count_headings(
    document: &Html,
    token: &CancellationToken,
) -> Result<HeadingCounts, AnalysisError> {
    let mut counts = HeadingCounts::new();

    for tag in HEADING_TAGS {
        checkpoint(token)?;
        let count = Selector::parse(tag)
            .map(|selector| document.select(&selector).count())
            .unwrap_or(0);
        counts.insert(tag.to_string(), count as u32);
    }

    Ok(counts)
}

/// Login heuristic: a password input, or a form that looks like a login form
pub fn has_login_form(document: &Html) -> bool {
    if let Ok(input_selector) = Selector::parse("input[type]") {
        let has_password = document.select(&input_selector).any(|input| {
            input
                .value()
                .attr("type")
                .is_some_and(|t| t.eq_ignore_ascii_case("password"))
        });
        if has_password {
            return true;
        }
    }

    let Ok(form_selector) = Selector::parse("form") else {
        return false;
    };

    document.select(&form_selector).any(|form| {
        ["action", "class"].iter().any(|attr| {
            form.value().attr(attr).is_some_and(|value| {
                let value = value.to_lowercase();
                LOGIN_MARKERS.iter().any(|marker| value.contains(marker))
            })
        })
    })
}

/// Collects every anchor `href` attribute
pub fn extract_hrefs(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::to_string)
        .collect()
}
