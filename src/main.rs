use clap::Parser;
use hawqs_builder::cli::{Command, RootArgs};
use hawqs_builder::{
    Config, ConsoleProgress, Error, JobStatus, Orchestrator, ProjectRequest, Result, ToExitCode,
    WorkflowReport, cancel_on_signal,
};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match RootArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            // --help and --version print to stdout and succeed
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing(args.verbose);

    match run(args).await {
        Ok(report) => {
            print_summary(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, code = e.error_code(), "workflow failed");
            eprintln!("error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "hawqs_builder=debug"
    } else {
        "hawqs_builder=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: RootArgs) -> Result<WorkflowReport> {
    let config = Config::load(&args.settings)?;
    tracing::info!(workflow = args.command.name(), base_url = %config.base_url, "starting");

    let token = CancellationToken::new();
    tokio::spawn(cancel_on_signal(token.clone()));
    let orchestrator = Orchestrator::with_http(config)?.with_cancellation(token.clone());

    tokio::select! {
        result = run_workflow(&orchestrator, args.command) => result,
        _ = token.cancelled() => Err(Error::Cancelled),
    }
}

async fn run_workflow(orchestrator: &Orchestrator, command: Command) -> Result<WorkflowReport> {
    let mut progress = ConsoleProgress::stdout();
    let on_tick = |status: &JobStatus| progress.on_tick(status);

    match command {
        Command::CreateProject => {
            orchestrator
                .create_project(&ProjectRequest::huc8_default(), on_tick)
                .await
        }
        Command::CreateDefaultScenarioAndRun { project_id } => {
            orchestrator
                .create_default_scenario_and_run(project_id, on_tick)
                .await
        }
        Command::CreateIclusScenarioAndRun { project_id } => {
            orchestrator
                .create_iclus_scenario_and_run(project_id, on_tick)
                .await
        }
        Command::CreateCustomLupScenarioAndRun { project_id, path } => {
            orchestrator
                .create_custom_lup_scenario_and_run(project_id, &path, on_tick)
                .await
        }
        Command::CreatePointSourceScenarioAndRun { project_id, path } => {
            orchestrator
                .create_point_source_scenario_and_run(project_id, &path, on_tick)
                .await
        }
        Command::ZipProject { project_id } => orchestrator.zip_project(project_id, on_tick).await,
    }
}

fn print_summary(report: &WorkflowReport) {
    for artifact in &report.artifacts {
        println!(
            "Saved {} ({}) to {}",
            artifact.name,
            artifact.format,
            artifact.path.display()
        );
    }
    for scenario in &report.scenario_artifacts {
        println!(
            "Saved {} files for scenario {} to {}",
            scenario.artifacts.len(),
            scenario.id,
            scenario.target_dir.display()
        );
    }
    match report.remote_error() {
        // The trace itself was already printed by the progress renderer
        Some(error) => println!("{} request ID {} failed remotely", error.kind, error.id),
        None => println!("{} request ID {} complete", report.kind, report.id),
    }
}
