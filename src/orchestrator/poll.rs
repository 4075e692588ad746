//! Status polling.
//!
//! A job is queried immediately and then once per interval until its progress reaches 100.
//! Waiting indefinitely is the default; a deadline and a cancellation token can bound it.

use super::Orchestrator;
use crate::config::PollConfig;
use crate::error::{Error, Result};
use crate::retry::with_retry;
use crate::transport::TransportRequest;
use crate::types::{JobStatus, StatusDocument};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How long and how often to poll
#[derive(Clone, Debug)]
pub struct PollOptions {
    /// Wait between status queries
    pub interval: Duration,
    /// Give up once this much time has passed (`None` waits indefinitely)
    pub deadline: Option<Duration>,
    /// Stop waiting when cancelled
    pub cancel: Option<CancellationToken>,
}

impl PollOptions {
    /// Poll every `interval` with no deadline and no cancellation
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
            cancel: None,
        }
    }

    /// Options from the `PollIntervalSecs` and `PollDeadlineSecs` settings
    pub fn from_config(config: &PollConfig) -> Self {
        Self {
            interval: config.interval,
            deadline: config.deadline,
            cancel: None,
        }
    }

    /// Give up after `deadline`
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Stop when `token` is cancelled
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|token| token.is_cancelled())
    }
}

impl Orchestrator {
    /// Poll options from configuration plus the orchestrator's cancellation token
    pub fn poll_options(&self) -> PollOptions {
        let options = PollOptions::from_config(&self.config.poll);
        match &self.cancel {
            Some(token) => options.with_cancel(token.clone()),
            None => options,
        }
    }

    /// Query a status URL once
    ///
    /// Network failures below the HTTP layer are retried per `PollRetry`; a non-success
    /// status or a body without a `status` object is returned as an error right away.
    pub async fn query_status(&self, status_url: &str) -> Result<StatusDocument> {
        with_retry(&self.config.poll.retry, || self.query_status_once(status_url)).await
    }

    async fn query_status_once(&self, status_url: &str) -> Result<StatusDocument> {
        let response = self
            .transport
            .send(TransportRequest::get(status_url))
            .await?
            .error_for_status("status query")?;
        let body = response.bytes().await?;
        StatusDocument::from_json(&body)
    }

    /// Query `status_url` until the job is terminal
    ///
    /// `on_tick` sees every queried status, the terminal one included. The terminal document
    /// is returned whether the job succeeded or failed; classify it with
    /// [`JobStatus::outcome`].
    ///
    /// # Errors
    ///
    /// - [`Error::PollDeadlineExceeded`] once `options.deadline` has passed; the last wait is
    ///   shortened to end at the deadline and no query is sent after it
    /// - [`Error::Cancelled`] when `options.cancel` fires
    /// - any error from [`Orchestrator::query_status`]
    pub async fn poll_until_terminal<F>(
        &self,
        status_url: &str,
        options: &PollOptions,
        mut on_tick: F,
    ) -> Result<StatusDocument>
    where
        F: FnMut(&JobStatus),
    {
        let started = Instant::now();
        let mut ticks: u64 = 0;

        loop {
            if options.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let document = self.query_status(status_url).await?;
            ticks += 1;
            on_tick(&document.status);

            tracing::debug!(
                url = status_url,
                progress = document.status.progress,
                message = %document.status.message,
                tick = ticks,
                "status"
            );

            if document.status.is_terminal() {
                tracing::info!(
                    url = status_url,
                    ticks,
                    elapsed_secs = started.elapsed().as_secs(),
                    "job reached terminal state"
                );
                return Ok(document);
            }

            let wait = match options.deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_sub(started.elapsed());
                    if remaining.is_zero() {
                        return Err(Error::PollDeadlineExceeded {
                            elapsed: started.elapsed(),
                            last_progress: document.status.progress,
                        });
                    }
                    options.interval.min(remaining)
                }
                None => options.interval,
            };

            match &options.cancel {
                Some(token) => {
                    tokio::select! {
                        _ = token.cancelled() => return Err(Error::Cancelled),
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
                None => tokio::time::sleep(wait).await,
            }

            if let Some(deadline) = options.deadline
                && started.elapsed() >= deadline
            {
                return Err(Error::PollDeadlineExceeded {
                    elapsed: started.elapsed(),
                    last_progress: document.status.progress,
                });
            }
        }
    }
}
