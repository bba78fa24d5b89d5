use std::time::Duration;

use talos_core::{Error, JobHandle, JobState, JobStatus, Result};

use crate::client::TalosClient;
use crate::options::{CrawlOptions, ScrapeOptions};

impl TalosClient {
    /// Submit a crawl job and wait for its final aggregated result.
    pub async fn crawl(
        &self,
        url: &str,
        options: &CrawlOptions,
        poll_interval: Duration,
    ) -> Result<JobStatus> {
        let handle = self.start_crawl(url, options).await?;
        self.wait_for_job(&handle, poll_interval).await
    }

    /// Submit a batch-scrape job and wait for its final aggregated result.
    pub async fn batch_scrape(
        &self,
        urls: &[String],
        options: &ScrapeOptions,
        poll_interval: Duration,
    ) -> Result<JobStatus> {
        let handle = self.start_batch_scrape(urls, options).await?;
        self.wait_for_job(&handle, poll_interval).await
    }

    /// Poll a crawl or batch-scrape job until it reaches a terminal state.
    ///
    /// Sleeps `poll_interval` between polls and loops without bound.
    /// Callers that need a deadline race this future against their own
    /// timer; abandoning the poll does not cancel the server-side job
    /// (see [`cancel_crawl`](TalosClient::cancel_crawl) for that).
    ///
    /// On `completed`, every pending result page is fetched through the
    /// retrying transport and concatenated in server order. A `next` page
    /// that turns out empty stops pagination, the same as a missing
    /// `next`. A page fetch that still fails after retries ends
    /// pagination early and returns everything accumulated so far.
    ///
    /// `failed` and `cancelled` map to [`Error::Job`] carrying the
    /// remote message.
    pub async fn wait_for_job(
        &self,
        handle: &JobHandle,
        poll_interval: Duration,
    ) -> Result<JobStatus> {
        loop {
            let status = self.job_status(handle).await?;
            match status.status {
                JobState::Completed => return self.collect_pages(handle, status).await,
                JobState::Failed | JobState::Cancelled => {
                    return Err(Error::job(
                        status.status,
                        status
                            .error
                            .unwrap_or_else(|| format!("job ended as {}", status.status)),
                    ));
                }
                state => {
                    tracing::debug!(
                        job_id = %handle.id(),
                        %state,
                        completed = ?status.completed,
                        total = ?status.total,
                        "Job still in progress"
                    );
                    tokio::time::sleep(poll_interval).await;
                }
            }
        }
    }

    /// Follow `next` links, appending each page's items in arrival order.
    async fn collect_pages(&self, handle: &JobHandle, mut status: JobStatus) -> Result<JobStatus> {
        let action = "fetch result page";

        while let Some(next) = status.next.take() {
            let response = match self.transport().get(action, &next).await {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(
                        job_id = %handle.id(),
                        error = %err,
                        "Result page fetch failed, returning partial data"
                    );
                    break;
                }
            };

            if !response.status().is_success() {
                tracing::warn!(
                    job_id = %handle.id(),
                    status = response.status().as_u16(),
                    "Result page fetch rejected, returning partial data"
                );
                break;
            }

            let body = match response.text().await {
                Ok(body) => body,
                Err(err) => {
                    tracing::warn!(
                        job_id = %handle.id(),
                        error = %err,
                        "Result page body unreadable, returning partial data"
                    );
                    break;
                }
            };

            // A page that fetched but does not decode is a real defect,
            // not a transient server hiccup; it fails the poll.
            let page: JobStatus =
                serde_json::from_str(&body).map_err(|e| Error::decode(action, e))?;

            if page.data.is_empty() {
                // Guards against a server bug handing out endless pages.
                break;
            }

            status.data.extend(page.data);
            status.next = page.next;
        }

        status.success = status.error.is_none();
        tracing::info!(
            job_id = %handle.id(),
            documents = status.data.len(),
            "Job completed"
        );
        Ok(status)
    }
}
