//! Page analysis against mock servers

use crate::common::{html5_page, test_analyzer};
use page_inspector::state::{HtmlVersion, BROKEN_LABEL};
use page_inspector::AnalysisError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_page(server: &MockServer, route: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_head(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_analyzes_page_metrics() {
    let site = MockServer::start().await;
    // Same host, different port: counts as external
    let other = MockServer::start().await;

    mount_page(
        &site,
        "/",
        html5_page(
            "  Home Page  ",
            &format!(
                r##"<h1>Welcome</h1><h2>One</h2><h2>Two</h2>
                <a href="/about">About</a>
                <a href="/about">About again</a>
                <a href="{site}/contact">Contact</a>
                <a href="{other}/">Elsewhere</a>
                <a href="#top">Top</a>
                <a href="javascript:void(0)">JS</a>
                <a href="mailto:team@example.com">Mail</a>
                <a href="tel:+15550100">Call</a>
                <a href="">Empty</a>"##,
                site = site.uri(),
                other = other.uri()
            ),
        ),
    )
    .await;

    // Duplicate hrefs are probed once
    Mock::given(method("HEAD"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&site)
        .await;
    mount_head(&site, "/contact", 200).await;
    mount_head(&other, "/", 200).await;

    let result = test_analyzer()
        .analyze(&format!("{}/", site.uri()), &CancellationToken::new())
        .await
        .expect("analysis should succeed");

    assert_eq!(result.html_version, Some(HtmlVersion::Html5));
    assert_eq!(result.title, "Home Page");
    assert_eq!(result.headings["h1"], 1);
    assert_eq!(result.headings["h2"], 2);
    assert_eq!(result.headings["h3"], 0);
    assert_eq!(result.internal_links, 3);
    assert_eq!(result.external_links, 1);
    assert!(result.broken_links.is_empty());
    assert!(!result.has_login_form);
}

#[tokio::test]
async fn test_broken_link_detection() {
    let site = MockServer::start().await;

    mount_page(
        &site,
        "/",
        html5_page(
            "Links",
            r#"<a href="/missing">404</a>
               <a href="/error">500</a>
               <a href="/guarded">999</a>
               <a href="/moved">301</a>
               <a href="/slow">slow</a>"#,
        ),
    )
    .await;

    mount_head(&site, "/missing", 404).await;
    mount_head(&site, "/error", 500).await;
    mount_head(&site, "/guarded", 999).await;
    mount_head(&site, "/target", 200).await;
    Mock::given(method("HEAD"))
        .and(path("/moved"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/target"))
        .mount(&site)
        .await;
    // Slower than the probe timeout for both HEAD and the GET fallback
    Mock::given(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&site)
        .await;

    let result = test_analyzer()
        .analyze(&format!("{}/", site.uri()), &CancellationToken::new())
        .await
        .expect("analysis should succeed");

    let broken = |route: &str| format!("{}{}", site.uri(), route);

    assert_eq!(result.internal_links, 5);
    assert_eq!(result.broken_links.len(), 3);
    assert_eq!(result.broken_links[&broken("/missing")], BROKEN_LABEL);
    assert_eq!(result.broken_links[&broken("/error")], BROKEN_LABEL);
    assert_eq!(result.broken_links[&broken("/slow")], BROKEN_LABEL);
    assert!(!result.broken_links.contains_key(&broken("/guarded")));
    assert!(!result.broken_links.contains_key(&broken("/moved")));
}

#[tokio::test]
async fn test_non_200_page_fails() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&site)
        .await;

    let analyzer = test_analyzer();
    let token = CancellationToken::new();

    let error = analyzer
        .analyze(&format!("{}/gone", site.uri()), &token)
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        AnalysisError::NonSuccessStatus { status: 404, .. }
    ));

    let error = analyzer
        .analyze(&format!("{}/empty", site.uri()), &token)
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        AnalysisError::NonSuccessStatus { status: 204, .. }
    ));
}

#[tokio::test]
async fn test_redirect_loop_is_too_many_redirects() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
        .mount(&site)
        .await;

    let error = test_analyzer()
        .analyze(&format!("{}/loop", site.uri()), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(error, AnalysisError::TooManyRedirects { .. }));
    assert_eq!(error.job_status(), page_inspector::JobStatus::Failed);
}

#[tokio::test]
async fn test_redirects_within_cap_are_followed() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .mount(&site)
        .await;
    mount_page(&site, "/new", html5_page("Moved", "<h1>Here</h1>")).await;

    let result = test_analyzer()
        .analyze(&format!("{}/old", site.uri()), &CancellationToken::new())
        .await
        .expect("analysis should succeed");

    assert_eq!(result.title, "Moved");
}

#[tokio::test]
async fn test_xhtml_and_login_form() {
    let site = MockServer::start().await;
    mount_page(
        &site,
        "/login",
        r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>Sign in</title></head>
<body><form action="/session" method="post">
<input type="text" name="user" /><input type="password" name="pass" />
</form></body></html>"#
            .to_string(),
    )
    .await;

    let result = test_analyzer()
        .analyze(&format!("{}/login", site.uri()), &CancellationToken::new())
        .await
        .expect("analysis should succeed");

    assert_eq!(result.html_version, Some(HtmlVersion::Xhtml));
    assert!(result.has_login_form);
    assert_eq!(result.internal_links, 0);
}

#[tokio::test]
async fn test_reanalysis_is_deterministic() {
    let site = MockServer::start().await;
    mount_page(
        &site,
        "/",
        html5_page(
            "Stable",
            r#"<h3>A</h3><a href="/a">A</a><a href="/b">B</a><form class="auth-form"></form>"#,
        ),
    )
    .await;
    mount_head(&site, "/a", 200).await;
    mount_head(&site, "/b", 404).await;

    let analyzer = test_analyzer();
    let url = format!("{}/", site.uri());

    let first = analyzer
        .analyze(&url, &CancellationToken::new())
        .await
        .unwrap();
    let second = analyzer
        .analyze(&url, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(first, second);
    assert!(first.has_login_form);
    assert_eq!(first.broken_links.len(), 1);
}

#[tokio::test]
async fn test_cancelled_token_stops_before_fetch() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&site)
        .await;

    let token = CancellationToken::new();
    token.cancel();

    let error = test_analyzer()
        .analyze(&format!("{}/", site.uri()), &token)
        .await
        .unwrap_err();
    assert!(error.is_cancelled());
}
