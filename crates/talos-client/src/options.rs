use std::collections::HashMap;

use serde::Serialize;
use talos_core::{Error, Result};

/// Output formats a scrape can request for each page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Format {
    Markdown,
    Html,
    RawHtml,
    Links,
    Screenshot,
}

/// Options for scraping a single page.
///
/// Also nested inside [`CrawlOptions`] and used for batch scrapes. Every
/// field is optional; an omitted field falls back to the server-side
/// default noted on it, and never appears on the wire.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeOptions {
    /// Formats to return per page. Server default: markdown only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formats: Option<Vec<Format>>,

    /// Strip navigation and page chrome. Server default: true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only_main_content: Option<bool>,

    /// HTML tags to keep, e.g. `["article", "main"]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_tags: Option<Vec<String>>,

    /// HTML tags to drop, e.g. `["nav", "footer"]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_tags: Option<Vec<String>>,

    /// Extra headers to send to the target site.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,

    /// Milliseconds to let the page settle before capture. Server default: 0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<u64>,

    /// Per-page timeout in milliseconds. Server default: 30000.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Emulate a mobile viewport. Server default: false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<bool>,
}

impl ScrapeOptions {
    pub fn with_formats(mut self, formats: impl Into<Vec<Format>>) -> Self {
        self.formats = Some(formats.into());
        self
    }

    pub fn with_only_main_content(mut self, only_main_content: bool) -> Self {
        self.only_main_content = Some(only_main_content);
        self
    }

    pub fn with_timeout_ms(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Options for a crawl job.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlOptions {
    /// Maximum number of pages to crawl. Server default: 10000.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Maximum link depth from the starting URL. Server default: 10.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,

    /// Path prefixes to crawl; everything else is skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_paths: Option<Vec<String>>,

    /// Path prefixes to skip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_paths: Option<Vec<String>>,

    /// Skip sitemap discovery. Server default: false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_sitemap: Option<bool>,

    /// Follow links above the starting path. Server default: false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_backward_links: Option<bool>,

    /// Follow links to other hosts. Server default: false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_external_links: Option<bool>,

    /// Per-page scrape options applied to every crawled page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrape_options: Option<ScrapeOptions>,
}

impl CrawlOptions {
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_scrape_options(mut self, scrape_options: ScrapeOptions) -> Self {
        self.scrape_options = Some(scrape_options);
        self
    }
}

/// Options for mapping a site's URLs.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapOptions {
    /// Filter returned links by this search term.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    /// Skip sitemap discovery. Server default: false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_sitemap: Option<bool>,

    /// Include subdomain links. Server default: false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_subdomains: Option<bool>,

    /// Maximum number of links to return. Server default: 5000.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Options for a structured extraction job.
///
/// An extraction needs a `prompt` or a `schema` (or both);
/// [`validate`](Self::validate) enforces this before any network call.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractOptions {
    /// Source URLs to extract from.
    pub urls: Vec<String>,

    /// Natural-language extraction instruction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// JSON Schema the extracted data must match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Follow links to other hosts while gathering content. Server default: false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_external_links: Option<bool>,

    /// Let the server augment the sources with a web search. Server default: false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_web_search: Option<bool>,
}

impl ExtractOptions {
    pub fn new(urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Reject incomplete extraction requests before any network call.
    pub fn validate(&self) -> Result<()> {
        if self.urls.is_empty() {
            return Err(Error::InvalidRequest(
                "extraction requires at least one url".into(),
            ));
        }
        if self.prompt.is_none() && self.schema.is_none() {
            return Err(Error::InvalidRequest(
                "extraction requires a prompt or a schema".into(),
            ));
        }
        Ok(())
    }
}
