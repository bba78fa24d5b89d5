use std::time::{Duration, Instant};

use talos_client::Transport;
use talos_client::transport::expect_json;
use talos_core::{Error, JobStatus, RetryPolicy};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts).with_base_delay(Duration::from_millis(5))
}

#[tokio::test]
async fn retries_server_errors_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/crawl/job-1"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/crawl/job-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "completed"})),
        )
        .mount(&server)
        .await;

    let transport = Transport::new("test-key", fast_policy(3)).unwrap();
    let url = format!("{}/v1/crawl/job-1", server.uri());

    let response = transport.get("check crawl status", &url).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/crawl/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(serde_json::json!({"error": "no such job"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transport = Transport::new("test-key", fast_policy(3)).unwrap();
    let url = format!("{}/v1/crawl/missing", server.uri());

    let response = transport.get("check crawl status", &url).await.unwrap();
    let err = expect_json::<JobStatus>("check crawl status", response)
        .await
        .unwrap_err();

    match err {
        Error::Api {
            status, message, ..
        } => {
            assert_eq!(status, 404);
            assert_eq!(message, "no such job");
        }
        other => panic!("expected Api error, got {other}"),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn exhausted_retries_fail_with_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/crawl/job-1"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let transport = Transport::new("test-key", fast_policy(3)).unwrap();
    let url = format!("{}/v1/crawl/job-1", server.uri());

    let err = transport
        .get("check crawl status", &url)
        .await
        .unwrap_err();

    match err {
        Error::Transport {
            action,
            attempts,
            message,
        } => {
            assert_eq!(action, "check crawl status");
            assert_eq!(attempts, 3);
            assert!(message.contains("503"));
        }
        other => panic!("expected Transport error, got {other}"),
    }
}

#[tokio::test]
async fn backoff_delays_grow_between_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    // Delays: 80ms after attempt 1, 160ms after attempt 2.
    let policy = RetryPolicy::new(3).with_base_delay(Duration::from_millis(40));
    let transport = Transport::new("test-key", policy).unwrap();
    let url = format!("{}/v1/crawl/job-1", server.uri());

    let start = Instant::now();
    let _ = transport.get("check crawl status", &url).await;
    let elapsed = start.elapsed();

    assert!(
        elapsed >= Duration::from_millis(220),
        "three attempts should sleep ~240ms total, elapsed: {elapsed:?}"
    );
}

#[tokio::test]
async fn requests_carry_auth_and_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/crawl/job-1"))
        .and(header("Authorization", "Bearer test-key"))
        .and(header("Content-Type", "application/json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "scraping"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transport = Transport::new("test-key", fast_policy(1)).unwrap();
    let url = format!("{}/v1/crawl/job-1", server.uri());

    let response = transport.get("check crawl status", &url).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn api_error_falls_back_to_raw_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400).set_body_string("not json at all"))
        .mount(&server)
        .await;

    let transport = Transport::new("test-key", fast_policy(1)).unwrap();
    let url = format!("{}/v1/crawl/job-1", server.uri());

    let response = transport.get("check crawl status", &url).await.unwrap();
    let err = expect_json::<JobStatus>("check crawl status", response)
        .await
        .unwrap_err();

    match err {
        Error::Api {
            status, message, ..
        } => {
            assert_eq!(status, 400);
            assert_eq!(message, "not json at all");
        }
        other => panic!("expected Api error, got {other}"),
    }
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"status\": 42}"))
        .mount(&server)
        .await;

    let transport = Transport::new("test-key", fast_policy(1)).unwrap();
    let url = format!("{}/v1/crawl/job-1", server.uri());

    let response = transport.get("check crawl status", &url).await.unwrap();
    let err = expect_json::<JobStatus>("check crawl status", response)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Decode { .. }));
}
