//! Job creation.

use super::Orchestrator;
use crate::error::{Error, Result};
use crate::requests::JobSpec;
use crate::transport::TransportRequest;
use crate::types::{Endpoint, JobHandle, JobId, ResourceKind};
use serde_json::Value;

impl Orchestrator {
    /// Create a job from a typed payload
    ///
    /// The payload type decides the resource (`/builder/project/...` or
    /// `/builder/scenario/...`), `endpoint` decides whether the server starts it right away.
    ///
    /// # Errors
    ///
    /// - [`Error::Transport`] if the server rejects the request
    /// - [`Error::Protocol`] if the response lacks an integer `id` or a `url`
    pub async fn submit<S: JobSpec>(&self, spec: &S, endpoint: Endpoint) -> Result<JobHandle> {
        let kind = S::KIND;
        let target = format!(
            "/builder/{}/{}",
            kind.path_segment(),
            endpoint.path_segment()
        );

        tracing::debug!(kind = %kind, endpoint = endpoint.path_segment(), "submitting request");

        let request = TransportRequest::post_json(target, spec)?;
        let response = self
            .transport
            .send(request)
            .await?
            .error_for_status(&format!("{} creation", kind))?;
        let body = response.text().await?;

        let handle = parse_creation_response(&body, kind)?;
        tracing::info!(job_id = %handle.id, kind = %kind, url = %handle.status_url, "request submitted");
        Ok(handle)
    }
}

/// Strictly validate a creation response; `id` and `url` are both required
pub(crate) fn parse_creation_response(body: &str, kind: ResourceKind) -> Result<JobHandle> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| Error::protocol(format!("creation response is not JSON: {}", e), body))?;

    let id = value
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::protocol("creation response has no integer id", body))?;

    let status_url = value
        .get("url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| Error::protocol("creation response has no url", body))?;

    Ok(JobHandle {
        id: JobId(id),
        kind,
        status_url: status_url.to_string(),
    })
}
