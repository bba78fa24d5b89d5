use std::time::Duration;

use talos_core::{Error, ExtractStatus, JobHandle, JobKind, JobState, Result};

use crate::client::TalosClient;
use crate::options::ExtractOptions;
use crate::transport;

impl TalosClient {
    /// Submit a structured extraction job. Validates the options before
    /// any network call.
    pub async fn start_extract(&self, options: &ExtractOptions) -> Result<JobHandle> {
        const ACTION: &str = "start extract job";
        options.validate()?;
        self.start_job(ACTION, JobKind::Extract, options).await
    }

    /// Submit an extraction job and wait for the final result.
    pub async fn extract(
        &self,
        options: &ExtractOptions,
        poll_interval: Duration,
    ) -> Result<ExtractStatus> {
        let handle = self.start_extract(options).await?;
        self.wait_for_extract(&handle, poll_interval).await
    }

    /// One status snapshot for an extraction job.
    pub async fn extract_status(&self, handle: &JobHandle) -> Result<ExtractStatus> {
        const ACTION: &str = "check extract status";

        let url = format!("{}/{}", self.endpoint(JobKind::Extract.path()), handle.id());
        let response = self.transport().get(ACTION, &url).await?;
        let mut status: ExtractStatus = transport::expect_json(ACTION, response).await?;
        status.success = status.error.is_none();
        Ok(status)
    }

    /// Poll an extraction job until it reaches a terminal state.
    ///
    /// The same unbounded loop as [`wait_for_job`](TalosClient::wait_for_job),
    /// but extraction results arrive whole — no pagination.
    pub async fn wait_for_extract(
        &self,
        handle: &JobHandle,
        poll_interval: Duration,
    ) -> Result<ExtractStatus> {
        loop {
            let status = self.extract_status(handle).await?;
            match status.status {
                JobState::Completed => {
                    tracing::info!(job_id = %handle.id(), "Extraction completed");
                    return Ok(status);
                }
                JobState::Failed | JobState::Cancelled => {
                    return Err(Error::job(
                        status.status,
                        status
                            .error
                            .unwrap_or_else(|| format!("job ended as {}", status.status)),
                    ));
                }
                state => {
                    tracing::debug!(job_id = %handle.id(), %state, "Extraction still in progress");
                    tokio::time::sleep(poll_interval).await;
                }
            }
        }
    }
}
