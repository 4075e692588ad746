//! Error types for hawqs-builder
//!
//! This module provides the error taxonomy used by every workflow step:
//! - Fatal, fail-fast errors returned as [`Error`] (validation, transport, protocol, I/O)
//! - The reportable remote failure outcome [`RemoteJobError`], which never aborts a workflow
//! - Exit code and machine-readable code mapping for the command line surface

use crate::types::{JobId, ResourceKind};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for hawqs-builder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for hawqs-builder
///
/// Every variant except the poll guards (`PollDeadlineExceeded`, `Cancelled`) maps onto one
/// of the failure classes a workflow can hit before the job reaches a terminal state.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing input, detected before any network call
    #[error("validation error: {message}")]
    Validation {
        /// Human-readable description of the rejected input
        message: String,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The settings key that caused the error (e.g., "ApiKey")
        key: Option<String>,
    },

    /// The API answered with a non-success status code
    #[error("{context} failed: HTTP {status} {reason}")]
    Transport {
        /// HTTP status code
        status: u16,
        /// Reason phrase reported with the status
        reason: String,
        /// Which request failed (e.g., "scenario creation")
        context: String,
    },

    /// A well-formed response is missing data the workflow requires
    #[error("unexpected API response: {message}")]
    Protocol {
        /// What was missing or malformed
        message: String,
        /// Raw response body, kept for diagnostics
        body: String,
    },

    /// Local filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error below the HTTP layer (connect, timeout, broken stream)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Polling gave up because the configured deadline passed
    #[error("job did not finish within {elapsed:?} (last progress {last_progress}%)")]
    PollDeadlineExceeded {
        /// Time spent polling
        elapsed: Duration,
        /// Progress reported by the last successful status query
        last_progress: i32,
    },

    /// Polling was cancelled by the caller
    #[error("polling cancelled")]
    Cancelled,
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error for a specific settings key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Create a protocol error, keeping the offending body
    pub fn protocol(message: impl Into<String>, body: impl Into<String>) -> Self {
        Error::Protocol {
            message: message.into(),
            body: body.into(),
        }
    }
}

/// A job reached a terminal state carrying an error trace
///
/// This is a reportable business outcome rather than a client-side failure: the workflow
/// still retrieves whatever outputs the job declared.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} request {id} failed remotely: {trace}")]
pub struct RemoteJobError {
    /// The job that failed
    pub id: JobId,
    /// Project or scenario
    pub kind: ResourceKind,
    /// Error stack trace reported by the server
    pub trace: String,
}

/// Convert errors to process exit codes for the command line surface
///
/// This is the CLI counterpart of mapping domain errors to HTTP status codes.
pub trait ToExitCode {
    /// Process exit code for this error
    fn exit_code(&self) -> u8;

    /// Machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToExitCode for Error {
    fn exit_code(&self) -> u8 {
        // Every failure class exits with 1; 0 is reserved for a workflow that ran to the end.
        1
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Validation { .. } => "validation_error",
            Error::Config { .. } => "config_error",
            Error::Transport { .. } => "transport_error",
            Error::Protocol { .. } => "protocol_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::PollDeadlineExceeded { .. } => "poll_deadline_exceeded",
            Error::Cancelled => "cancelled",
        }
    }
}
