//! Run and zip actions.

use super::Orchestrator;
use crate::error::Result;
use crate::transport::TransportRequest;
use crate::types::{JobId, ResourceKind, RunAction};

impl Orchestrator {
    /// Start server-side work on an existing request
    ///
    /// Sends `PATCH /builder/{kind}/{action}/{id}`. A rejected trigger is an
    /// [`crate::Error::Transport`] naming the action.
    pub async fn trigger(&self, kind: ResourceKind, action: RunAction, id: JobId) -> Result<()> {
        let target = format!(
            "/builder/{}/{}/{}",
            kind.path_segment(),
            action.path_segment(),
            id
        );
        tracing::info!(job_id = %id, kind = %kind, action = action.path_segment(), "triggering");

        self.transport
            .send(TransportRequest::patch(target))
            .await?
            .error_for_status(&format!("{} {}", kind, action.path_segment()))?;

        Ok(())
    }
}
