//! Worker lifecycle, stop and rerun against mock servers

use crate::common::{html5_page, test_fetch_config, Harness};
use page_inspector::config::FetchConfig;
use page_inspector::jobs::Tick;
use page_inspector::state::{HtmlVersion, JobStatus};
use page_inspector::storage::JobStore;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_simple_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html5_page(
            "Simple",
            r#"<h1>Hello</h1><a href="/next">Next</a>"#,
        )))
        .mount(server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/next"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// Polls until `check` holds, failing the test after a few seconds
async fn wait_for(mut check: impl FnMut() -> bool) {
    for _ in 0..300 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn test_worker_completes_job() {
    let site = MockServer::start().await;
    mount_simple_site(&site).await;

    let harness = Harness::new();
    let job = harness.control.submit(&format!("{}/", site.uri())).unwrap();

    let tick = harness.worker.tick().await.unwrap();
    assert_eq!(
        tick,
        Tick::Processed {
            id: job.id.clone(),
            status: JobStatus::Completed,
            applied: true,
        }
    );

    let done = harness.control.get(&job.id).unwrap().unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.result.html_version, Some(HtmlVersion::Html5));
    assert_eq!(done.result.title, "Simple");
    assert_eq!(done.result.internal_links, 1);
    assert!(done.completed_at.is_some());
    assert!(harness.registry.is_empty());

    // Nothing left to do
    assert_eq!(harness.worker.tick().await.unwrap(), Tick::Idle);
}

#[tokio::test]
async fn test_failed_page_marks_job_failed() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&site)
        .await;

    let harness = Harness::new();
    let job = harness.control.submit(&format!("{}/", site.uri())).unwrap();

    let tick = harness.worker.tick().await.unwrap();
    assert!(matches!(
        tick,
        Tick::Processed {
            status: JobStatus::Failed,
            applied: true,
            ..
        }
    ));

    let failed = harness.control.get(&job.id).unwrap().unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert!(failed.result.is_empty());
    assert!(failed.completed_at.is_none());
    assert!(harness.registry.is_empty());
}

#[tokio::test]
async fn test_stopped_queued_job_is_never_processed() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&site)
        .await;

    let harness = Harness::new();
    let job = harness.control.submit(&format!("{}/", site.uri())).unwrap();

    assert_eq!(harness.control.stop(&[job.id.clone()]).unwrap(), 1);
    assert_eq!(harness.worker.tick().await.unwrap(), Tick::Idle);

    let stopped = harness.control.get(&job.id).unwrap().unwrap();
    assert_eq!(stopped.status, JobStatus::Cancelled);
    assert!(stopped.result.is_empty());
}

#[tokio::test]
async fn test_stopping_processing_job_cancels_analysis() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html5_page("Slow", r#"<a href="/never">x</a>"#))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&site)
        .await;
    // Cancellation is observed before any probe
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&site)
        .await;

    let harness = Harness::new();
    let job = harness.control.submit(&format!("{}/", site.uri())).unwrap();

    let worker = harness.worker.clone();
    let running = tokio::spawn(async move { worker.tick().await });

    let registry = harness.registry.clone();
    let id = job.id.clone();
    wait_for(|| registry.is_registered(&id)).await;
    assert_eq!(
        harness.control.status(&job.id).unwrap(),
        Some(JobStatus::Processing)
    );

    assert_eq!(harness.control.stop(&[job.id.clone()]).unwrap(), 1);

    let tick = running.await.unwrap().unwrap();
    assert!(matches!(
        tick,
        Tick::Processed {
            status: JobStatus::Cancelled,
            ..
        }
    ));

    let cancelled = harness.control.get(&job.id).unwrap().unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);
    assert!(cancelled.result.is_empty());
    assert!(cancelled.completed_at.is_none());
    assert!(harness.registry.is_empty());
}

#[tokio::test]
async fn test_stop_during_link_pass_skips_remaining_links() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html5_page(
            "Links",
            r#"<a href="/first">1</a><a href="/second">2</a>"#,
        )))
        .mount(&site)
        .await;
    // Slow enough to stop the job while this request is outstanding
    Mock::given(method("HEAD"))
        .and(path("/first"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(1)
        .mount(&site)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/second"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&site)
        .await;

    let harness = Harness::with_fetch_config(FetchConfig {
        probe_timeout_ms: 5_000,
        ..test_fetch_config()
    });
    let job = harness.control.submit(&format!("{}/", site.uri())).unwrap();

    let worker = harness.worker.clone();
    let running = tokio::spawn(async move { worker.tick().await });

    let mut first_link_requested = false;
    for _ in 0..300 {
        let requests = site.received_requests().await.unwrap_or_default();
        if requests.iter().any(|r| r.url.path() == "/first") {
            first_link_requested = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(first_link_requested, "first link was never probed");

    assert_eq!(harness.control.stop(&[job.id.clone()]).unwrap(), 1);

    let tick = running.await.unwrap().unwrap();
    assert!(matches!(
        tick,
        Tick::Processed {
            status: JobStatus::Cancelled,
            ..
        }
    ));

    let cancelled = harness.control.get(&job.id).unwrap().unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);
    assert!(cancelled.result.is_empty());
    assert!(harness.registry.is_empty());
}

#[tokio::test]
async fn test_rerun_completed_job() {
    let site = MockServer::start().await;
    mount_simple_site(&site).await;

    let harness = Harness::new();
    let job = harness.control.submit(&format!("{}/", site.uri())).unwrap();
    harness.worker.tick().await.unwrap();

    assert_eq!(harness.control.rerun(&[job.id.clone()]).unwrap(), 1);
    let requeued = harness.control.get(&job.id).unwrap().unwrap();
    assert_eq!(requeued.status, JobStatus::Queued);
    // Previous results stay visible until the job completes again
    assert_eq!(requeued.result.title, "Simple");

    let tick = harness.worker.tick().await.unwrap();
    assert!(matches!(
        tick,
        Tick::Processed {
            status: JobStatus::Completed,
            applied: true,
            ..
        }
    ));
    assert_eq!(
        harness.control.status(&job.id).unwrap(),
        Some(JobStatus::Completed)
    );
}

#[tokio::test]
async fn test_rerun_processing_job_is_rejected() {
    let harness = Harness::new();
    let job = harness.control.submit("https://example.com/").unwrap();
    assert!(harness.store.mark_processing(&job.id).unwrap());

    assert_eq!(harness.control.rerun(&[job.id.clone()]).unwrap(), 0);
    assert_eq!(
        harness.control.status(&job.id).unwrap(),
        Some(JobStatus::Processing)
    );
}

#[tokio::test]
async fn test_run_loop_processes_until_shutdown() {
    let site = MockServer::start().await;
    mount_simple_site(&site).await;

    let harness = Harness::new();
    let shutdown = CancellationToken::new();
    let worker = harness.worker.clone();
    let handle = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { worker.run(shutdown).await })
    };

    let first = harness.control.submit(&format!("{}/", site.uri())).unwrap();
    let second = harness.control.submit(&format!("{}/", site.uri())).unwrap();

    let store = harness.store.clone();
    let ids = [first.id.clone(), second.id.clone()];
    wait_for(|| {
        ids.iter()
            .all(|id| store.get_status(id).unwrap() == Some(JobStatus::Completed))
    })
    .await;

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("worker should stop after shutdown")
        .unwrap();
}
