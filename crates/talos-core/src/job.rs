use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Document;

/// Remote state of an asynchronous job.
///
/// `Queued` only appears on the extraction endpoint; crawl and batch-scrape
/// jobs report `scraping`/`processing` while in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Scraping,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Scraping => "scraping",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        }
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "queued" => Ok(JobState::Queued),
            "scraping" => Ok(JobState::Scraping),
            "processing" => Ok(JobState::Processing),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            "cancelled" => Ok(JobState::Cancelled),
            _ => Err(format!("Unknown job state: {}", s)),
        }
    }
}

/// Which endpoint family a job belongs to.
///
/// Crawl and batch-scrape jobs share one status protocol against different
/// paths; extraction has its own status shape and no pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Crawl,
    BatchScrape,
    Extract,
}

impl JobKind {
    /// Path segment under `/v1/` for this job family.
    pub fn path(&self) -> &'static str {
        match self {
            JobKind::Crawl => "crawl",
            JobKind::BatchScrape => "batch/scrape",
            JobKind::Extract => "extract",
        }
    }
}

/// Opaque identifier of a submitted job.
///
/// Immutable once created; holds everything needed to poll, watch, or
/// cancel the job against the owning client's configuration.
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: String,
    kind: JobKind,
}

impl JobHandle {
    pub fn new(id: impl Into<String>, kind: JobKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }
}

/// One status snapshot of a crawl or batch-scrape job.
///
/// Produced fresh on every poll and never mutated afterwards; the poller
/// composes successive snapshots by concatenating `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub status: JobState,

    /// Derived client-side: true exactly when `error` is absent.
    #[serde(default)]
    pub success: bool,

    /// Expected total item count, when the server knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,

    /// Items finished so far.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits_used: Option<u64>,

    /// When the stored result set expires server-side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Result items accumulated so far, in server order.
    #[serde(default)]
    pub data: Vec<Document>,

    /// Full URL of the next result page, when pagination is pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Status snapshot of an extraction job. No pagination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractStatus {
    pub status: JobState,

    #[serde(default)]
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Per-item error records for a job, passed through from the server
/// without any merge logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlErrors {
    #[serde(default)]
    pub errors: Vec<ItemError>,

    /// URLs skipped because robots.txt disallowed them.
    #[serde(default)]
    pub robots_blocked: Vec<String>,
}

/// One failed item inside a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    pub url: String,

    pub error: String,
}
