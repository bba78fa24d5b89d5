use std::time::Duration;

use reqwest::{Client, Method, Request, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use talos_core::{Error, Result, RetryPolicy};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP transport with bounded retry and exponential backoff.
///
/// 5xx responses and connection-level failures (network error, timeout)
/// are presumed transient and retried per the [`RetryPolicy`]; any
/// response in 200..=499 is returned to the caller immediately, since a
/// 4xx is a request defect that retrying cannot fix.
///
/// Backoff sleeps block only the calling task.
#[derive(Clone)]
pub struct Transport {
    http: Client,
    api_key: String,
    policy: RetryPolicy,
}

/// Attempt-level failure worth retrying.
///
/// Distinct from [`Error`] on purpose: this type drives the retry loop
/// and never reaches the caller.
struct Retryable(String);

impl Transport {
    pub fn new(api_key: impl Into<String>, policy: RetryPolicy) -> Result<Self> {
        Self::with_timeout(api_key, policy, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        api_key: impl Into<String>,
        policy: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("talos-client/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::transport("build HTTP client", 0, e.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            policy,
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn get(&self, action: &str, url: &str) -> Result<Response> {
        let request = self
            .builder(Method::GET, url)
            .build()
            .map_err(|e| Error::transport(action, 0, e.to_string()))?;
        self.execute(action, request).await
    }

    pub async fn delete(&self, action: &str, url: &str) -> Result<Response> {
        let request = self
            .builder(Method::DELETE, url)
            .build()
            .map_err(|e| Error::transport(action, 0, e.to_string()))?;
        self.execute(action, request).await
    }

    /// POST a JSON body. `idempotency_key` is sent as `x-idempotency-key`
    /// so a retried creation request is safe to repeat server-side.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        action: &str,
        url: &str,
        idempotency_key: Option<&str>,
        body: &B,
    ) -> Result<Response> {
        let mut builder = self.builder(Method::POST, url).json(body);
        if let Some(key) = idempotency_key {
            builder = builder.header("x-idempotency-key", key);
        }
        let request = builder
            .build()
            .map_err(|e| Error::transport(action, 0, e.to_string()))?;
        self.execute(action, request).await
    }

    fn builder(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .bearer_auth(&self.api_key)
    }

    /// Issue one request with bounded retry.
    ///
    /// Retries sleep `policy.delay_for_attempt(n)` between attempts;
    /// exhaustion fails with [`Error::Transport`] carrying the attempt
    /// count and the last cause.
    pub async fn execute(&self, action: &str, request: Request) -> Result<Response> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;

            // Bodies here are always buffered JSON, so the clone cannot fail.
            let this_try = request.try_clone().ok_or_else(|| {
                Error::transport(action, attempt, "request body cannot be replayed")
            })?;

            let failure = match self.attempt(this_try).await {
                Ok(response) => return Ok(response),
                Err(Retryable(message)) => message,
            };

            if attempt >= self.policy.max_attempts {
                return Err(Error::transport(action, attempt, failure));
            }

            let delay = self.policy.delay_for_attempt(attempt);
            tracing::warn!(
                action,
                attempt,
                delay_ms = %delay.as_millis(),
                error = %failure,
                "Request failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(&self, request: Request) -> std::result::Result<Response, Retryable> {
        match self.http.execute(request).await {
            Ok(response) if response.status().is_server_error() => Err(Retryable(format!(
                "HTTP {}",
                response.status().as_u16()
            ))),
            Ok(response) => Ok(response),
            Err(e) => Err(Retryable(e.to_string())),
        }
    }
}

/// Decode a success response body into `T`.
///
/// Non-2xx responses become [`Error::Api`]; a body that is not the
/// expected shape becomes [`Error::Decode`].
pub async fn expect_json<T: DeserializeOwned>(action: &str, response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(api_error(action, response).await);
    }

    let body = response
        .text()
        .await
        .map_err(|e| Error::transport(action, 1, format!("failed to read response body: {e}")))?;

    serde_json::from_str(&body).map_err(|e| Error::decode(action, e))
}

/// Build an [`Error::Api`] from a non-success response, extracting the
/// structured `{"error": ...}` message and falling back to the raw body
/// text when the body itself does not decode.
pub async fn api_error(action: &str, response: Response) -> Error {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: String,
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or_else(|_| {
            if body.is_empty() {
                format!("HTTP {status}")
            } else {
                body
            }
        });

    Error::api(action, status, message)
}
