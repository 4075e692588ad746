//! Core types for hawqs-builder

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

use crate::error::{Error, RemoteJobError, Result};

/// Progress value at which the API reports a job as finished
pub const TERMINAL_PROGRESS: i32 = 100;

/// Server-assigned identifier of a project or scenario request
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl JobId {
    /// Create a new JobId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for JobId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<JobId> for i64 {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Kind of builder resource a job operates on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// A watershed project (subbasins, HRUs, watershed files)
    Project,
    /// A simulation scenario attached to a project
    Scenario,
}

impl ResourceKind {
    /// Path segment used by the builder API (`/builder/{segment}/...`)
    pub fn path_segment(&self) -> &'static str {
        match self {
            ResourceKind::Project => "project",
            ResourceKind::Scenario => "scenario",
        }
    }

    /// Status endpoint path for a request of this kind
    pub fn status_path(&self, id: JobId) -> String {
        format!("/builder/{}/{}", self.path_segment(), id)
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// Creation endpoint variant
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    /// Create the resource and wait for an explicit run trigger
    CreateOnly,
    /// Create the resource and start it immediately
    CreateAndRun,
}

impl Endpoint {
    /// Path segment of the endpoint
    pub fn path_segment(&self) -> &'static str {
        match self {
            Endpoint::CreateOnly => "create-only",
            Endpoint::CreateAndRun => "create-and-run",
        }
    }
}

/// State-changing action that starts server-side work on an existing request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunAction {
    /// Run a created scenario
    Run,
    /// Zip a project with its GIS data
    Zip,
}

impl RunAction {
    /// Path segment of the action
    pub fn path_segment(&self) -> &'static str {
        match self {
            RunAction::Run => "run",
            RunAction::Zip => "zip",
        }
    }
}

/// Supplementary input that can be uploaded to a created scenario before it runs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachmentKind {
    /// Land use update zip
    LandUseUpdate,
    /// Point source data zip
    PointSource,
}

impl AttachmentKind {
    /// Path segment of the upload endpoint
    pub fn path_segment(&self) -> &'static str {
        match self {
            AttachmentKind::LandUseUpdate => "add-lup",
            AttachmentKind::PointSource => "add-point-source",
        }
    }

    /// Human-readable label for logs and errors
    pub fn label(&self) -> &'static str {
        match self {
            AttachmentKind::LandUseUpdate => "land use update",
            AttachmentKind::PointSource => "point source",
        }
    }
}

/// Identifies a created job for all subsequent calls
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JobHandle {
    /// Server-assigned request id
    pub id: JobId,
    /// Project or scenario
    pub kind: ResourceKind,
    /// URL to query for status, as returned by the creation response
    pub status_url: String,
}

/// Status-only flags the API reports alongside progress
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusFlags {
    /// Project finished creating (projects only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_created: Option<bool>,
    /// Project HRU settings are usable for ICLUS land use (projects only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub are_hru_settings_correct_for_iclus: Option<bool>,
    /// Scenario has been run (scenarios only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_run: Option<bool>,
    /// Scenario can use ICLUS land use (scenarios only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_use_iclus: Option<bool>,
}

/// Snapshot of a job's progress, replaced wholesale on every poll
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    /// Percent complete, 0-100
    pub progress: i32,
    /// Current step description
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    /// Error stack trace; blank traces are normalized to `None`
    #[serde(
        rename = "errorStackTrace",
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub error_trace: Option<String>,
    /// Resource-specific flags
    #[serde(flatten)]
    pub flags: StatusFlags,
}

impl JobStatus {
    /// Create a status with the given progress and message
    pub fn new(progress: i32, message: impl Into<String>) -> Self {
        Self {
            progress,
            message: message.into(),
            ..Default::default()
        }
    }

    /// Attach an error trace
    pub fn with_error_trace(mut self, trace: impl Into<String>) -> Self {
        let trace = trace.into();
        self.error_trace = if trace.trim().is_empty() {
            None
        } else {
            Some(trace)
        };
        self
    }

    /// A job is terminal once progress reaches 100, whether or not it failed
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.progress >= TERMINAL_PROGRESS
    }

    /// Terminal with an error trace
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.is_terminal() && self.error_trace.is_some()
    }

    /// Classify a terminal status; `None` while the job is still running
    pub fn outcome(&self, id: JobId, kind: ResourceKind) -> Option<JobOutcome> {
        if !self.is_terminal() {
            return None;
        }
        Some(match &self.error_trace {
            Some(trace) => JobOutcome::Failed(RemoteJobError {
                id,
                kind,
                trace: trace.clone(),
            }),
            None => JobOutcome::Succeeded,
        })
    }
}

/// How a terminal job ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// Terminal without an error trace
    Succeeded,
    /// Terminal with an error trace
    Failed(RemoteJobError),
}

impl JobOutcome {
    /// Returns true for a failed job
    pub fn is_failed(&self) -> bool {
        matches!(self, JobOutcome::Failed(_))
    }
}

/// One declared output of a terminal job
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputManifestEntry {
    /// Display name
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Download URL
    pub url: String,
    /// File format label (csv, netcdf, zip, ...)
    #[serde(default, deserialize_with = "null_as_default")]
    pub format: String,
}

impl OutputManifestEntry {
    /// Create a manifest entry
    pub fn new(name: impl Into<String>, url: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            format: format.into(),
        }
    }
}

/// A scenario nested in a project status document
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSummary {
    /// Scenario request id
    pub id: JobId,
    /// Scenario status URL
    #[serde(default)]
    pub url: Option<String>,
    /// Scenario name
    #[serde(default)]
    pub name: Option<String>,
    /// Whether the scenario has run
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_run: bool,
    /// Outputs declared by the scenario
    #[serde(default, deserialize_with = "null_as_default")]
    pub output: Vec<OutputManifestEntry>,
}

/// Full body of a status query
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusDocument {
    /// Progress snapshot
    pub status: JobStatus,
    /// Output manifest (empty until the job is terminal)
    pub output: Vec<OutputManifestEntry>,
    /// Nested scenarios (project documents only)
    pub scenarios: Vec<ScenarioSummary>,
}

#[derive(Deserialize)]
struct RawStatusDocument {
    #[serde(default)]
    status: Option<JobStatus>,
    #[serde(default, deserialize_with = "null_as_default")]
    output: Vec<OutputManifestEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    scenarios: Vec<ScenarioSummary>,
}

impl StatusDocument {
    /// Build a document from a status snapshot with no outputs
    pub fn from_status(status: JobStatus) -> Self {
        Self {
            status,
            output: Vec::new(),
            scenarios: Vec::new(),
        }
    }

    /// Decode a status response body
    ///
    /// A body that does not decode, or that has no `status` object, is a protocol error
    /// carrying the raw body.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let raw: RawStatusDocument = serde_json::from_slice(body).map_err(|e| {
            Error::protocol(
                format!("malformed status response: {}", e),
                String::from_utf8_lossy(body),
            )
        })?;
        let status = raw.status.ok_or_else(|| {
            Error::protocol(
                "status response has no status object",
                String::from_utf8_lossy(body),
            )
        })?;
        Ok(Self {
            status,
            output: raw.output,
            scenarios: raw.scenarios,
        })
    }
}

/// A file written by the output fetcher
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LocalArtifact {
    /// Manifest display name
    pub name: String,
    /// Manifest format label
    pub format: String,
    /// Source URL
    pub url: String,
    /// Written file
    pub path: PathBuf,
    /// Bytes written
    pub bytes: u64,
}

/// Per-job folder under the save root
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactFolder {
    /// `Project_{id}`
    Project,
    /// `Scenario_{id}`
    Scenario,
    /// `ProjectZip_{id}`
    ProjectZip,
}

impl ArtifactFolder {
    /// Folder name for a job id
    pub fn dir_name(&self, id: JobId) -> String {
        let prefix = match self {
            ArtifactFolder::Project => "Project",
            ArtifactFolder::Scenario => "Scenario",
            ArtifactFolder::ProjectZip => "ProjectZip",
        };
        format!("{}_{}", prefix, id)
    }
}

/// Outputs collected for a scenario nested in a project
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScenarioArtifacts {
    /// Scenario request id
    pub id: JobId,
    /// Folder the outputs were written to
    pub target_dir: PathBuf,
    /// Written files
    pub artifacts: Vec<LocalArtifact>,
}

/// Result of a workflow that ran to completion
#[derive(Clone, Debug)]
pub struct WorkflowReport {
    /// Resource the workflow drove
    pub kind: ResourceKind,
    /// Request id
    pub id: JobId,
    /// Terminal status
    pub status: JobStatus,
    /// Succeeded or failed remotely
    pub outcome: JobOutcome,
    /// Folder the outputs were written to
    pub target_dir: PathBuf,
    /// Written files, in manifest order
    pub artifacts: Vec<LocalArtifact>,
    /// Outputs of nested scenarios, when collected
    pub scenario_artifacts: Vec<ScenarioArtifacts>,
    /// When the workflow started
    pub started_at: DateTime<Utc>,
    /// When the workflow finished
    pub finished_at: DateTime<Utc>,
}

impl WorkflowReport {
    /// Remote failure, if the job failed
    pub fn remote_error(&self) -> Option<&RemoteJobError> {
        match &self.outcome {
            JobOutcome::Failed(e) => Some(e),
            JobOutcome::Succeeded => None,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn blank_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|trace| !trace.trim().is_empty()))
}
