//! # hawqs-builder
//!
//! Client-side orchestrator for the HAWQS project builder API.
//!
//! A HAWQS build is a long-running remote job. This crate drives one through its lifecycle:
//! create a project or scenario, optionally upload supplementary input, trigger the run, poll
//! until the job is terminal, and save the job's declared outputs under a local folder.
//!
//! ## Design
//!
//! - **Fail fast** - any client-side failure before the job is terminal aborts the workflow
//! - **Remote failures are outcomes** - a job that ends with an error trace is reported in
//!   the [`WorkflowReport`] and its outputs are still retrieved
//! - **No rendering assumptions** - progress is delivered to a callback
//! - **One transport per invocation** - every call goes through a shared [`Transport`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use hawqs_builder::{Config, JobId, Orchestrator};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(Path::new("appsettings.json"))?;
//!     let orchestrator = Orchestrator::with_http(config)?;
//!
//!     let report = orchestrator
//!         .create_default_scenario_and_run(JobId(1234), |status| {
//!             println!("{}% - {}", status.progress, status.message);
//!         })
//!         .await?;
//!
//!     if let Some(error) = report.remote_error() {
//!         eprintln!("{error}");
//!     }
//!     for artifact in &report.artifacts {
//!         println!("saved {}", artifact.path.display());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Command line arguments
pub mod cli;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Job lifecycle orchestration (decomposed into focused submodules)
pub mod orchestrator;
/// Console progress rendering
pub mod progress;
/// Job creation payloads
pub mod requests;
/// Retry logic with exponential backoff
pub mod retry;
/// Authenticated transport
pub mod transport;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, FetchConfig, PollConfig, RetryConfig};
pub use error::{Error, RemoteJobError, Result, ToExitCode};
pub use orchestrator::{Orchestrator, PollOptions};
pub use progress::ConsoleProgress;
pub use requests::{JobSpec, ProjectRequest, ScenarioRequest};
pub use transport::{HttpTransport, Transport, TransportRequest, TransportResponse};
pub use types::{
    AttachmentKind, Endpoint, JobHandle, JobId, JobOutcome, JobStatus, LocalArtifact,
    OutputManifestEntry, ResourceKind, RunAction, StatusDocument, WorkflowReport,
};

/// Cancel `token` when the process receives a termination signal.
///
/// - **Unix:** SIGTERM or SIGINT, falling back to `ctrl_c()` if registration fails.
/// - **Windows/other:** Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Pair it with [`Orchestrator::with_cancellation`] so an interrupted poll returns
/// [`Error::Cancelled`] instead of killing the process mid-write.
pub async fn cancel_on_signal(token: tokio_util::sync::CancellationToken) {
    wait_for_signal().await;
    token.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
