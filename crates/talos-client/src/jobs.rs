use serde::{Deserialize, Serialize};
use talos_core::{CrawlErrors, Error, JobHandle, JobKind, JobStatus, Result};
use uuid::Uuid;

use crate::client::TalosClient;
use crate::options::{CrawlOptions, ScrapeOptions};
use crate::transport;

/// Wire shape of a job-creation response.
#[derive(Debug, Deserialize)]
pub(crate) struct CreateJobResponse {
    #[serde(default)]
    pub success: bool,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub error: Option<String>,
}

impl TalosClient {
    /// Submit a crawl job. Returns immediately with a handle to poll or
    /// watch.
    pub async fn start_crawl(&self, url: &str, options: &CrawlOptions) -> Result<JobHandle> {
        const ACTION: &str = "start crawl job";

        #[derive(Serialize)]
        struct CrawlRequest<'a> {
            url: &'a str,
            #[serde(flatten)]
            options: &'a CrawlOptions,
        }

        self.start_job(ACTION, JobKind::Crawl, &CrawlRequest { url, options })
            .await
    }

    /// Submit a batch-scrape job over a list of URLs.
    pub async fn start_batch_scrape(
        &self,
        urls: &[String],
        options: &ScrapeOptions,
    ) -> Result<JobHandle> {
        const ACTION: &str = "start batch scrape job";

        #[derive(Serialize)]
        struct BatchScrapeRequest<'a> {
            urls: &'a [String],
            #[serde(flatten)]
            options: &'a ScrapeOptions,
        }

        self.start_job(
            ACTION,
            JobKind::BatchScrape,
            &BatchScrapeRequest { urls, options },
        )
        .await
    }

    /// One status snapshot for a crawl or batch-scrape job. Does not
    /// follow pagination; see [`wait_for_job`](TalosClient::wait_for_job).
    pub async fn job_status(&self, handle: &JobHandle) -> Result<JobStatus> {
        let action = status_action(handle.kind());
        let url = format!("{}/{}", self.endpoint(handle.kind().path()), handle.id());

        let response = self.transport().get(action, &url).await?;
        let mut status: JobStatus = transport::expect_json(action, response).await?;
        status.success = status.error.is_none();
        Ok(status)
    }

    /// Per-item error records for a job, passed through unmerged.
    pub async fn job_errors(&self, handle: &JobHandle) -> Result<CrawlErrors> {
        let action = match handle.kind() {
            JobKind::BatchScrape => "list batch scrape errors",
            _ => "list crawl errors",
        };
        let url = format!(
            "{}/{}/errors",
            self.endpoint(handle.kind().path()),
            handle.id()
        );

        let response = self.transport().get(action, &url).await?;
        transport::expect_json(action, response).await
    }

    /// Cancel a crawl job server-side.
    ///
    /// A one-shot operation, deliberately separate from polling:
    /// abandoning a poll does not cancel the job, this does.
    pub async fn cancel_crawl(&self, handle: &JobHandle) -> Result<()> {
        const ACTION: &str = "cancel crawl job";

        #[derive(Deserialize)]
        struct CancelResponse {
            #[serde(default)]
            status: String,
        }

        let url = format!("{}/{}", self.endpoint(handle.kind().path()), handle.id());
        let response = self.transport().delete(ACTION, &url).await?;
        let ack: CancelResponse = transport::expect_json(ACTION, response).await?;

        tracing::info!(job_id = %handle.id(), status = %ack.status, "Cancelled crawl job");
        Ok(())
    }

    pub(crate) async fn start_job<B: Serialize>(
        &self,
        action: &'static str,
        kind: JobKind,
        body: &B,
    ) -> Result<JobHandle> {
        let idempotency_key = self.creation_idempotency_key();
        let response = self
            .transport()
            .post_json(
                action,
                &self.endpoint(kind.path()),
                Some(&idempotency_key),
                body,
            )
            .await?;

        let created: CreateJobResponse = transport::expect_json(action, response).await?;
        match created.id {
            Some(id) if created.success => {
                tracing::info!(job_id = %id, "Job accepted");
                Ok(JobHandle::new(id, kind))
            }
            _ => Err(Error::api(
                action,
                200,
                created
                    .error
                    .unwrap_or_else(|| "server accepted the request but returned no job id".into()),
            )),
        }
    }

    /// Key for `x-idempotency-key` on creation calls: the configured one,
    /// or a fresh UUID per call.
    fn creation_idempotency_key(&self) -> String {
        self.config()
            .idempotency_key
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }
}

fn status_action(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Crawl => "check crawl status",
        JobKind::BatchScrape => "check batch scrape status",
        JobKind::Extract => "check extract status",
    }
}
