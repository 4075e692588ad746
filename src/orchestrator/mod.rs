//! Job lifecycle orchestration split into focused submodules.
//!
//! The `Orchestrator` struct and its methods are organized by lifecycle step:
//! - [`submit`] - Job creation from a typed payload
//! - [`attach`] - Supplementary file uploads to created jobs
//! - [`trigger`] - Run and zip actions on existing jobs
//! - [`poll`] - Status polling until a job is terminal
//! - [`fetch`] - Output manifest retrieval to local files
//! - [`workflows`] - Named end-to-end workflows composed from the steps above
//!
//! Every step issues its calls one at a time; only output retrieval may overlap downloads,
//! and only when `MaxConcurrentFetches` is above 1.

mod attach;
mod fetch;
mod poll;
mod submit;
mod trigger;
mod workflows;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use attach::validate_attachment_path;
pub use poll::PollOptions;

use crate::config::Config;
use crate::error::Result;
use crate::transport::{HttpTransport, Transport};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Drives project and scenario jobs through their lifecycle (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Orchestrator {
    /// Transport shared by every call of a workflow
    pub(crate) transport: Arc<dyn Transport>,
    /// Immutable settings
    pub(crate) config: Arc<Config>,
    /// Stops status polling when cancelled
    pub(crate) cancel: Option<CancellationToken>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("cancellable", &self.cancel.is_some())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator over any transport
    pub fn new(config: Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            config: Arc::new(config),
            cancel: None,
        }
    }

    /// Create an orchestrator backed by [`HttpTransport`]
    ///
    /// # Example
    ///
    /// ```no_run
    /// use hawqs_builder::{Config, Orchestrator, ProjectRequest};
    ///
    /// # async fn example() -> hawqs_builder::Result<()> {
    /// let config = Config::new("my-key", "https://dev-api.hawqs.tamu.edu", "/data/hawqs");
    /// let orchestrator = Orchestrator::with_http(config)?;
    /// let request = ProjectRequest::huc8_default();
    /// let report = orchestrator
    ///     .create_project(&request, |status| {
    ///         println!("{}% - {}", status.progress, status.message);
    ///     })
    ///     .await?;
    /// println!("project {} saved to {}", report.id, report.target_dir.display());
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_http(config: Config) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    /// Cancel status polling when `token` fires
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Settings shared by every step
    pub fn config(&self) -> Arc<Config> {
        self.config.clone()
    }
}
