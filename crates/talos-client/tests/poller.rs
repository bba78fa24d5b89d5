use std::time::Duration;

use talos_client::{ClientConfig, TalosClient};
use talos_core::{Error, JobHandle, JobKind, JobState, RetryPolicy};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const POLL: Duration = Duration::from_millis(10);

fn client_for(server: &MockServer) -> TalosClient {
    TalosClient::with_retry_policy(
        ClientConfig::new("test-key").with_api_url(server.uri()),
        RetryPolicy::new(2).with_base_delay(Duration::from_millis(5)),
    )
    .unwrap()
}

fn doc(markdown: &str) -> serde_json::Value {
    serde_json::json!({"markdown": markdown, "metadata": {}})
}

fn markdowns(status: &talos_core::JobStatus) -> Vec<String> {
    status
        .data
        .iter()
        .filter_map(|d| d.markdown.clone())
        .collect()
}

#[tokio::test]
async fn polls_until_completed_and_merges_pages_in_order() {
    let server = MockServer::start().await;

    // Page continuation; mounted first so the query match wins.
    Mock::given(method("GET"))
        .and(path("/v1/crawl/job-1"))
        .and(query_param("skip", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "completed",
            "data": [doc("c"), doc("d")]
        })))
        .mount(&server)
        .await;

    // First poll: still scraping.
    Mock::given(method("GET"))
        .and(path("/v1/crawl/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "scraping",
            "completed": 2,
            "total": 4
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    // Second poll: completed, first page with a continuation.
    Mock::given(method("GET"))
        .and(path("/v1/crawl/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "completed",
            "creditsUsed": 4,
            "data": [doc("a"), doc("b")],
            "next": format!("{}/v1/crawl/job-1?skip=2", server.uri())
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let handle = JobHandle::new("job-1", JobKind::Crawl);

    let status = client.wait_for_job(&handle, POLL).await.unwrap();

    assert_eq!(status.status, JobState::Completed);
    assert!(status.success);
    assert!(status.next.is_none());
    assert_eq!(markdowns(&status), ["a", "b", "c", "d"]);
}

#[tokio::test]
async fn pagination_stops_on_an_empty_page() {
    let server = MockServer::start().await;

    // The continuation page is present but empty, and dangles yet another
    // `next`; the poller must stop rather than loop.
    Mock::given(method("GET"))
        .and(path("/v1/crawl/job-2"))
        .and(query_param("skip", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "completed",
            "data": [],
            "next": format!("{}/v1/crawl/job-2?skip=1", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/crawl/job-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "completed",
            "data": [doc("a")],
            "next": format!("{}/v1/crawl/job-2?skip=1", server.uri())
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let handle = JobHandle::new("job-2", JobKind::Crawl);

    let status = client.wait_for_job(&handle, POLL).await.unwrap();

    assert_eq!(markdowns(&status), ["a"]);
    assert!(status.success);
}

#[tokio::test]
async fn failed_job_maps_to_job_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/crawl/job-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "failed",
            "error": "target site unreachable"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let handle = JobHandle::new("job-3", JobKind::Crawl);

    let err = client.wait_for_job(&handle, POLL).await.unwrap_err();

    assert!(err.is_job_failure());
    match err {
        Error::Job { state, message } => {
            assert_eq!(state, JobState::Failed);
            assert_eq!(message, "target site unreachable");
        }
        other => panic!("expected Job error, got {other}"),
    }
}

#[tokio::test]
async fn cancelled_job_maps_to_job_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/crawl/job-4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "cancelled",
            "error": "cancelled by operator"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let handle = JobHandle::new("job-4", JobKind::Crawl);

    let err = client.wait_for_job(&handle, POLL).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Job {
            state: JobState::Cancelled,
            ..
        }
    ));
}

#[tokio::test]
async fn completed_without_continuation_succeeds_directly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/crawl/job-5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "completed",
            "data": [doc("only")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let handle = JobHandle::new("job-5", JobKind::Crawl);

    let status = client.wait_for_job(&handle, POLL).await.unwrap();
    assert!(status.success);
    assert!(status.error.is_none());
    assert_eq!(markdowns(&status), ["only"]);
}

#[tokio::test]
async fn page_rejection_returns_partial_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/crawl/job-6"))
        .and(query_param("skip", "2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/crawl/job-6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "completed",
            "data": [doc("a"), doc("b")],
            "next": format!("{}/v1/crawl/job-6?skip=2", server.uri())
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let handle = JobHandle::new("job-6", JobKind::Crawl);

    let status = client.wait_for_job(&handle, POLL).await.unwrap();
    assert_eq!(markdowns(&status), ["a", "b"]);
    assert!(status.success);
}

#[tokio::test]
async fn page_transport_exhaustion_returns_partial_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/crawl/job-7"))
        .and(query_param("skip", "1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/crawl/job-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "completed",
            "data": [doc("a")],
            "next": format!("{}/v1/crawl/job-7?skip=1", server.uri())
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let handle = JobHandle::new("job-7", JobKind::Crawl);

    let status = client.wait_for_job(&handle, POLL).await.unwrap();
    assert_eq!(markdowns(&status), ["a"]);
}

#[tokio::test]
async fn batch_scrape_polls_its_own_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/batch/scrape/job-8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "completed",
            "data": [doc("x")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let handle = JobHandle::new("job-8", JobKind::BatchScrape);

    let status = client.wait_for_job(&handle, POLL).await.unwrap();
    assert_eq!(markdowns(&status), ["x"]);
}
