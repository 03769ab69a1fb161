//! uxa-analyzer - UI screenshot usability analyzer
//!
//! Runs one analysis of a screenshot and prints the run summary as JSON on
//! stdout. Logs go to stderr. Exit status is 0 iff the report exists.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uxa_analyzer::models::ContextHints;
use uxa_analyzer::{AnalyzerConfig, RunRequest, RunSummary, WorkflowOrchestrator};
use uxa_common::config::CompiledDefaults;

/// Analyze the usability of a UI screenshot
#[derive(Debug, Parser)]
#[command(name = "uxa-analyzer", version, about)]
struct Cli {
    /// Screenshot to analyze (PNG, JPEG, WebP, ...)
    image: PathBuf,

    /// Interface type hint (e.g. "web dashboard")
    #[arg(long)]
    interface_type: Option<String>,

    /// User scenario hint (e.g. "first-time checkout")
    #[arg(long)]
    scenario: Option<String>,

    /// Config file (overrides UXA_CONFIG and the per-user file)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Where deliverables are published
    #[arg(long, env = "UXA_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Parent of the private per-run directories
    #[arg(long, env = "UXA_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Keep the private run directory after publishing
    #[arg(long)]
    keep_workdir: bool,

    /// Also write the run summary JSON to this file
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(summary) if summary.report_present => ExitCode::SUCCESS,
        Ok(_) => {
            eprintln!("The analysis report could not be produced. See the run summary for details.");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("The analysis could not be run: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<RunSummary> {
    let defaults = CompiledDefaults::for_current_platform();

    // Config is resolved before logging exists, so its own messages are not shown
    let (config, config_path) = AnalyzerConfig::load(cli.config.as_deref())?;
    init_tracing(&config.logging.level);

    info!("Starting uxa-analyzer {}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Configuration: {}", path.display());
    }

    let mut settings = config.pipeline_settings(&defaults)?;
    if let Some(dir) = cli.output_dir {
        settings.output_dir = dir;
    }
    if let Some(dir) = cli.work_dir {
        settings.work_dir = dir;
    }
    settings.keep_workdir |= cli.keep_workdir;

    let services = config.build_services()?;
    let orchestrator = WorkflowOrchestrator::new(services, settings);

    let cancel_token = CancellationToken::new();
    let ctrl_c_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling after the current stage");
            ctrl_c_token.cancel();
        }
    });

    let request = RunRequest {
        image_path: cli.image,
        hints: ContextHints::new(cli.interface_type, cli.scenario),
    };

    let outcome = orchestrator.execute_run(request, &cancel_token).await?;

    let json = serde_json::to_string_pretty(&outcome.summary).context("serialize run summary")?;
    println!("{json}");

    if let Some(path) = cli.summary_json {
        std::fs::write(&path, &json).with_context(|| format!("write summary to {}", path.display()))?;
    }

    Ok(outcome.summary)
}
