//! Submitting renders and driving asynchronous jobs to a terminal state.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use designctl_api_types::{AsyncRenderAccepted, RenderJob, RenderRequestBody};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::{domain::render::RenderRequest, infra::error::InfraError};

use super::error::AppError;

/// Render endpoints of the remote API.
#[async_trait]
pub trait RenderApi: Send + Sync {
    /// `POST render` answered with the rendered file.
    async fn render_binary(&self, body: &RenderRequestBody) -> Result<Bytes, InfraError>;
    /// `POST render` with the async flag set.
    async fn render_async(&self, body: &RenderRequestBody)
    -> Result<AsyncRenderAccepted, InfraError>;
    async fn render_status(&self, job_id: &str) -> Result<RenderJob, InfraError>;
    async fn download(&self, location: &str) -> Result<Bytes, InfraError>;
}

#[derive(Clone)]
pub struct RenderOrchestrator {
    api: Arc<dyn RenderApi>,
    poll_interval: Duration,
}

impl RenderOrchestrator {
    pub fn new(api: Arc<dyn RenderApi>, poll_interval: Duration) -> Self {
        Self { api, poll_interval }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub async fn render_sync(&self, req: &RenderRequest) -> Result<Bytes, AppError> {
        let body = req.to_body(false)?;
        let started_at = Instant::now();
        let bytes = self.api.render_binary(&body).await.map_err(|err| {
            warn!(
                target = "application::orchestrator",
                op = "render_sync",
                result = "error",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                error = %err,
                "Render request failed"
            );
            AppError::from(err)
        })?;

        info!(
            target = "application::orchestrator",
            op = "render_sync",
            result = "ok",
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            bytes = bytes.len(),
            "Render completed"
        );
        Ok(bytes)
    }

    pub async fn render_async(&self, req: &RenderRequest) -> Result<AsyncRenderAccepted, AppError> {
        let body = req.to_body(true)?;
        let accepted = self.api.render_async(&body).await?;
        info!(
            target = "application::orchestrator",
            op = "render_async",
            job_id = %accepted.job_id,
            status = %accepted.status,
            "Render job accepted"
        );
        Ok(accepted)
    }

    pub async fn poll_status(&self, job_id: &str) -> Result<RenderJob, AppError> {
        Ok(self.api.render_status(job_id).await?)
    }

    pub async fn wait_for_completion(
        &self,
        job_id: &str,
        timeout: Duration,
    ) -> Result<RenderJob, AppError> {
        self.wait_for_completion_with(job_id, timeout, |_| {}).await
    }

    /// Poll until the job is completed or failed, calling `on_poll` with every
    /// observed state. One request is outstanding at a time and nothing is
    /// polled after a terminal state.
    pub async fn wait_for_completion_with<F>(
        &self,
        job_id: &str,
        timeout: Duration,
        mut on_poll: F,
    ) -> Result<RenderJob, AppError>
    where
        F: FnMut(&RenderJob) + Send,
    {
        let started_at = Instant::now();
        let mut polls: u32 = 0;

        loop {
            let job = self.poll_status(job_id).await?;
            polls += 1;
            on_poll(&job);

            if job.status.is_terminal() {
                info!(
                    target = "application::orchestrator",
                    op = "wait_for_completion",
                    result = %job.status,
                    job_id,
                    polls,
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    "Render job reached a terminal state"
                );
                return Ok(job);
            }

            let elapsed = started_at.elapsed();
            if elapsed >= timeout {
                warn!(
                    target = "application::orchestrator",
                    op = "wait_for_completion",
                    result = "timeout",
                    job_id,
                    polls,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Render job did not finish in time"
                );
                return Err(AppError::Timeout {
                    job_id: job_id.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }

            debug!(
                target = "application::orchestrator",
                op = "wait_for_completion",
                job_id,
                status = %job.status,
                "Render job still running"
            );
            sleep(self.poll_interval.min(timeout - elapsed)).await;
        }
    }

    /// Fetch the file a completed job points at.
    pub async fn download_output(&self, job: &RenderJob) -> Result<Bytes, AppError> {
        let location = job.output_url.as_deref().ok_or_else(|| {
            AppError::validation(format!("render job {} has no output URL", job.job_id))
        })?;
        Ok(self.api.download(location).await?)
    }
}
