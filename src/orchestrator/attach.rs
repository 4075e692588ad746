//! Supplementary file uploads.

use super::Orchestrator;
use crate::error::{Error, Result};
use crate::transport::{FileUpload, TransportRequest};
use crate::types::{AttachmentKind, JobHandle, ResourceKind};
use std::path::Path;

impl Orchestrator {
    /// Upload a zip archive to a created scenario that has not run yet
    ///
    /// The local file is checked before anything is sent and is streamed from disk.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if `path` is not an existing file or `handle` is not a scenario
    /// - [`Error::Transport`] if the server rejects the upload
    pub async fn attach(
        &self,
        handle: &JobHandle,
        attachment: AttachmentKind,
        path: &Path,
    ) -> Result<()> {
        validate_attachment_path(attachment, path).await?;

        if handle.kind != ResourceKind::Scenario {
            return Err(Error::validation(format!(
                "{} data can only be attached to a scenario, not {} {}",
                attachment.label(),
                handle.kind,
                handle.id
            )));
        }

        let target = format!(
            "/builder/scenario/{}/{}",
            attachment.path_segment(),
            handle.id
        );
        tracing::info!(
            job_id = %handle.id,
            path = %path.display(),
            attachment = attachment.label(),
            "uploading attachment"
        );

        self.transport
            .send(TransportRequest::put_file(target, FileUpload::zip(path)))
            .await?
            .error_for_status(&format!("{} upload", attachment.label()))?;

        tracing::debug!(job_id = %handle.id, "attachment accepted");
        Ok(())
    }
}

/// Fail with [`Error::Validation`] unless `path` is an existing regular file
pub async fn validate_attachment_path(attachment: AttachmentKind, path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => Ok(()),
        Ok(_) => Err(Error::validation(format!(
            "{} path is not a file: {}",
            attachment.label(),
            path.display()
        ))),
        Err(_) => Err(Error::validation(format!(
            "{} file not found: {}",
            attachment.label(),
            path.display()
        ))),
    }
}
