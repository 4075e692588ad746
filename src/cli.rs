//! Command line arguments for the `hawqs` binary.

use crate::config::DEFAULT_SETTINGS_FILE;
use crate::types::JobId;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint: global options plus one workflow per subcommand
#[derive(Parser, Debug)]
#[command(
    name = "hawqs",
    version,
    about = "Drive HAWQS project and scenario builds through the builder API",
    after_help = "Examples:\n  hawqs create-project\n  hawqs create-default-scenario-and-run 1234\n  hawqs create-custom-lup-scenario-and-run 1234 ./huc8-07100009-lup-upload-example.zip\n  hawqs zip-project 1234",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Settings file with an AppSettings section
    #[arg(long, global = true, value_name = "FILE", default_value = DEFAULT_SETTINGS_FILE)]
    pub settings: PathBuf,

    /// Log request-level detail to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Workflow to run
    #[command(subcommand)]
    pub command: Command,
}

/// Workflows
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a HUC8 project with ICLUS-compatible HRUs and save its watershed files
    CreateProject,

    /// Create and run a default PRISM scenario on a project
    CreateDefaultScenarioAndRun {
        /// Project request id
        project_id: JobId,
    },

    /// Check a project supports ICLUS, then create and run an ICLUS scenario
    CreateIclusScenarioAndRun {
        /// Project request id
        project_id: JobId,
    },

    /// Create a scenario, upload a land use update zip, and run it
    CreateCustomLupScenarioAndRun {
        /// Project request id
        project_id: JobId,
        /// Land use update zip archive
        #[arg(value_name = "ZIP")]
        path: PathBuf,
    },

    /// Create a scenario, upload a point source zip, and run it
    CreatePointSourceScenarioAndRun {
        /// Project request id
        project_id: JobId,
        /// Point source zip archive
        #[arg(value_name = "ZIP")]
        path: PathBuf,
    },

    /// Zip a project with its GIS data and save the archive
    ZipProject {
        /// Project request id
        project_id: JobId,
    },
}

impl Command {
    /// Subcommand name, for logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateProject => "create-project",
            Command::CreateDefaultScenarioAndRun { .. } => "create-default-scenario-and-run",
            Command::CreateIclusScenarioAndRun { .. } => "create-iclus-scenario-and-run",
            Command::CreateCustomLupScenarioAndRun { .. } => "create-custom-lup-scenario-and-run",
            Command::CreatePointSourceScenarioAndRun { .. } => {
                "create-point-source-scenario-and-run"
            }
            Command::ZipProject { .. } => "zip-project",
        }
    }
}
