//! Named end-to-end workflows.
//!
//! Every workflow ends the same way: the terminal status is classified, a remote failure is
//! logged with its trace, and the declared outputs are retrieved either way. Only a
//! client-side failure (validation, transport, protocol, I/O) aborts a workflow.

use super::Orchestrator;
use super::attach::validate_attachment_path;
use crate::error::{Error, Result};
use crate::requests::{ProjectRequest, ScenarioRequest};
use crate::types::{
    ArtifactFolder, AttachmentKind, Endpoint, JobId, JobOutcome, JobStatus, ResourceKind,
    RunAction, ScenarioArtifacts, StatusDocument, WorkflowReport,
};
use chrono::{DateTime, Utc};
use std::path::Path;

impl Orchestrator {
    /// Create a project, wait for it, and save its watershed files to `Project_{id}`
    ///
    /// With `FetchScenarioOutputs` set, outputs of scenarios listed in the project document
    /// are saved to `Scenario_{id}` folders as well.
    pub async fn create_project<F>(
        &self,
        request: &ProjectRequest,
        on_tick: F,
    ) -> Result<WorkflowReport>
    where
        F: FnMut(&JobStatus),
    {
        let started_at = Utc::now();
        let handle = self.submit(request, Endpoint::CreateOnly).await?;
        let document = self
            .poll_until_terminal(&handle.status_url, &self.poll_options(), on_tick)
            .await?;
        self.complete(
            ResourceKind::Project,
            handle.id,
            ArtifactFolder::Project,
            document,
            started_at,
        )
        .await
    }

    /// Create a scenario that starts right away, wait for it, and save its outputs
    pub async fn run_scenario<F>(
        &self,
        request: &ScenarioRequest,
        on_tick: F,
    ) -> Result<WorkflowReport>
    where
        F: FnMut(&JobStatus),
    {
        let started_at = Utc::now();
        let handle = self.submit(request, Endpoint::CreateAndRun).await?;
        let document = self
            .poll_until_terminal(&handle.status_url, &self.poll_options(), on_tick)
            .await?;
        self.complete(
            ResourceKind::Scenario,
            handle.id,
            ArtifactFolder::Scenario,
            document,
            started_at,
        )
        .await
    }

    /// Run the default PRISM scenario on an existing project
    pub async fn create_default_scenario_and_run<F>(
        &self,
        project_id: JobId,
        on_tick: F,
    ) -> Result<WorkflowReport>
    where
        F: FnMut(&JobStatus),
    {
        self.run_scenario(&ScenarioRequest::default_for(project_id), on_tick)
            .await
    }

    /// Run an ICLUS scenario after checking the project can support one
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if the project has not finished creating or its HRU settings
    /// do not match the ICLUS requirements; nothing is submitted in that case.
    pub async fn create_iclus_scenario_and_run<F>(
        &self,
        project_id: JobId,
        on_tick: F,
    ) -> Result<WorkflowReport>
    where
        F: FnMut(&JobStatus),
    {
        self.check_iclus_ready(project_id).await?;
        self.run_scenario(&ScenarioRequest::iclus(project_id), on_tick)
            .await
    }

    /// Verify a project is created with ICLUS-compatible HRU settings
    pub async fn check_iclus_ready(&self, project_id: JobId) -> Result<()> {
        let document = self
            .query_status(&ResourceKind::Project.status_path(project_id))
            .await?;
        let flags = &document.status.flags;

        if flags.is_created != Some(true) {
            return Err(Error::validation(format!(
                "project {} is not finished creating yet",
                project_id
            )));
        }
        if flags.are_hru_settings_correct_for_iclus != Some(true) {
            return Err(Error::validation(format!(
                "project {} HRU settings do not match ICLUS requirements",
                project_id
            )));
        }
        Ok(())
    }

    /// Create a scenario, upload a zip to it, run it, and save its outputs
    ///
    /// The file is checked before the scenario is created, and the upload happens exactly
    /// once, between creation and the run trigger.
    pub async fn create_scenario_attach_and_run<F>(
        &self,
        request: &ScenarioRequest,
        attachment: AttachmentKind,
        path: &Path,
        on_tick: F,
    ) -> Result<WorkflowReport>
    where
        F: FnMut(&JobStatus),
    {
        validate_attachment_path(attachment, path).await?;

        let started_at = Utc::now();
        let handle = self.submit(request, Endpoint::CreateOnly).await?;
        self.attach(&handle, attachment, path).await?;
        self.trigger(ResourceKind::Scenario, RunAction::Run, handle.id)
            .await?;
        let document = self
            .poll_until_terminal(&handle.status_url, &self.poll_options(), on_tick)
            .await?;
        self.complete(
            ResourceKind::Scenario,
            handle.id,
            ArtifactFolder::Scenario,
            document,
            started_at,
        )
        .await
    }

    /// Run a scenario with a custom land use update zip
    pub async fn create_custom_lup_scenario_and_run<F>(
        &self,
        project_id: JobId,
        path: &Path,
        on_tick: F,
    ) -> Result<WorkflowReport>
    where
        F: FnMut(&JobStatus),
    {
        self.create_scenario_attach_and_run(
            &ScenarioRequest::custom_lup(project_id),
            AttachmentKind::LandUseUpdate,
            path,
            on_tick,
        )
        .await
    }

    /// Run a scenario with a point source data zip
    pub async fn create_point_source_scenario_and_run<F>(
        &self,
        project_id: JobId,
        path: &Path,
        on_tick: F,
    ) -> Result<WorkflowReport>
    where
        F: FnMut(&JobStatus),
    {
        self.create_scenario_attach_and_run(
            &ScenarioRequest::point_source(project_id),
            AttachmentKind::PointSource,
            path,
            on_tick,
        )
        .await
    }

    /// Zip a project with its GIS data and save the archive to `ProjectZip_{id}`
    ///
    /// GIS data is only included when at least one scenario wrote an Access SWAT editor
    /// database.
    pub async fn zip_project<F>(&self, project_id: JobId, on_tick: F) -> Result<WorkflowReport>
    where
        F: FnMut(&JobStatus),
    {
        let started_at = Utc::now();
        self.trigger(ResourceKind::Project, RunAction::Zip, project_id)
            .await?;
        let document = self
            .poll_until_terminal(
                &ResourceKind::Project.status_path(project_id),
                &self.poll_options(),
                on_tick,
            )
            .await?;
        self.complete(
            ResourceKind::Project,
            project_id,
            ArtifactFolder::ProjectZip,
            document,
            started_at,
        )
        .await
    }

    async fn complete(
        &self,
        kind: ResourceKind,
        id: JobId,
        folder: ArtifactFolder,
        document: StatusDocument,
        started_at: DateTime<Utc>,
    ) -> Result<WorkflowReport> {
        let outcome = document.status.outcome(id, kind).ok_or_else(|| {
            Error::protocol(
                format!("{} {} is not terminal", kind, id),
                document.status.message.clone(),
            )
        })?;

        if let JobOutcome::Failed(remote) = &outcome {
            tracing::error!(job_id = %id, kind = %kind, trace = %remote.trace, "job failed remotely");
        }

        let target_dir = self.config.save_path.join(folder.dir_name(id));
        let artifacts = self.fetch_all(&document.output, &target_dir).await?;

        let mut scenario_artifacts = Vec::new();
        if folder == ArtifactFolder::Project && self.config.fetch.fetch_scenario_outputs {
            for scenario in document.scenarios.iter().filter(|s| !s.output.is_empty()) {
                let scenario_dir = self
                    .config
                    .save_path
                    .join(ArtifactFolder::Scenario.dir_name(scenario.id));
                let artifacts = self.fetch_all(&scenario.output, &scenario_dir).await?;
                scenario_artifacts.push(ScenarioArtifacts {
                    id: scenario.id,
                    target_dir: scenario_dir,
                    artifacts,
                });
            }
        }

        tracing::info!(
            job_id = %id,
            kind = %kind,
            failed = outcome.is_failed(),
            files = artifacts.len(),
            target_dir = %target_dir.display(),
            "workflow complete"
        );

        Ok(WorkflowReport {
            kind,
            id,
            status: document.status,
            outcome,
            target_dir,
            artifacts,
            scenario_artifacts,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
