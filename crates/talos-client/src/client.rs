use serde::{Deserialize, Serialize};
use talos_core::{Document, Error, JobHandle, Result, RetryPolicy};

use crate::options::{MapOptions, ScrapeOptions};
use crate::transport::{self, Transport};
use crate::watcher::CrawlWatcher;

pub const DEFAULT_API_URL: &str = "https://api.talos.dev";

/// Immutable configuration shared by every job started from one client.
///
/// Safe to clone freely; concurrent pollers and watchers hold read-only
/// copies.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub api_url: String,

    /// Sent as `x-idempotency-key` on job-creation calls. When unset, a
    /// fresh UUID is generated per creation call.
    pub idempotency_key: Option<String>,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            idempotency_key: None,
        }
    }

    /// Read `TALOS_API_KEY` (required) and `TALOS_API_URL` (optional).
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("TALOS_API_KEY")
            .map_err(|_| Error::InvalidRequest("TALOS_API_KEY is not set".into()))?;

        let mut config = Self::new(api_key);
        if let Ok(api_url) = std::env::var("TALOS_API_URL") {
            config = config.with_api_url(api_url);
        }
        Ok(config)
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Client for the Talos scraping/extraction API.
///
/// One-shot endpoints (`scrape`, `map`) answer inline; job endpoints
/// return a [`JobHandle`] observed to completion with
/// [`wait_for_job`](TalosClient::wait_for_job) (polling) or a
/// [`CrawlWatcher`] (streaming).
#[derive(Clone)]
pub struct TalosClient {
    config: ClientConfig,
    transport: Transport,
}

impl TalosClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(ClientConfig::new(api_key))
    }

    pub fn from_env() -> Result<Self> {
        Self::with_config(ClientConfig::from_env()?)
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        Self::with_retry_policy(config, RetryPolicy::default())
    }

    pub fn with_retry_policy(config: ClientConfig, policy: RetryPolicy) -> Result<Self> {
        let transport = Transport::new(&config.api_key, policy)?;
        Ok(Self { config, transport })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn transport(&self) -> &Transport {
        &self.transport
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.api_url, path)
    }

    /// Create a watcher for a crawl job. Call
    /// [`connect`](CrawlWatcher::connect) to start streaming.
    pub fn watcher(&self, handle: &JobHandle) -> CrawlWatcher {
        CrawlWatcher::new(handle.id(), self.config.clone())
    }

    /// Scrape one URL synchronously and return its document.
    pub async fn scrape(&self, url: &str, options: &ScrapeOptions) -> Result<Document> {
        const ACTION: &str = "scrape url";

        #[derive(Serialize)]
        struct ScrapeRequest<'a> {
            url: &'a str,
            #[serde(flatten)]
            options: &'a ScrapeOptions,
        }

        #[derive(Deserialize)]
        struct ScrapeResponse {
            #[serde(default)]
            success: bool,
            #[serde(default)]
            data: Option<Document>,
            #[serde(default)]
            error: Option<String>,
        }

        let response = self
            .transport
            .post_json(ACTION, &self.endpoint("scrape"), None, &ScrapeRequest { url, options })
            .await?;
        let scrape: ScrapeResponse = transport::expect_json(ACTION, response).await?;

        match scrape.data {
            Some(document) if scrape.success => Ok(document),
            _ => Err(Error::api(
                ACTION,
                200,
                scrape.error.unwrap_or_else(|| "scrape returned no document".into()),
            )),
        }
    }

    /// List the URLs of a site. One-shot.
    pub async fn map(&self, url: &str, options: &MapOptions) -> Result<Vec<String>> {
        const ACTION: &str = "map url";

        #[derive(Serialize)]
        struct MapRequest<'a> {
            url: &'a str,
            #[serde(flatten)]
            options: &'a MapOptions,
        }

        #[derive(Deserialize)]
        struct MapResponse {
            #[serde(default)]
            success: bool,
            #[serde(default)]
            links: Vec<String>,
            #[serde(default)]
            error: Option<String>,
        }

        let response = self
            .transport
            .post_json(ACTION, &self.endpoint("map"), None, &MapRequest { url, options })
            .await?;
        let map: MapResponse = transport::expect_json(ACTION, response).await?;

        if !map.success {
            return Err(Error::api(
                ACTION,
                200,
                map.error.unwrap_or_else(|| "map reported failure".into()),
            ));
        }
        Ok(map.links)
    }
}
