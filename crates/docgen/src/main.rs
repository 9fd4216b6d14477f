use anyhow::{Context, Result};
use clap::Parser;
use docgen::adapter::{OpenAiCompletion, TavilySearch};
use docgen::observability::{self, LogTarget, ObservabilityConfig};
use docgen::workflow::{CompileMode, ReportWorkflow, WorkflowConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;

/// Environment files read from the working directory, in order. Values already
/// present in the process environment win.
const ENV_FILES: [&str; 2] = ["secrets.env", "variables.env"];

/// `docgen` - research a topic on the web and write a structured report.
#[derive(Parser, Debug)]
#[command(name = "docgen")]
#[command(version)]
#[command(about = "Research a topic and write a structured report.", long_about = None)]
struct Cli {
    /// Topic of the report
    #[arg(short, long)]
    topic: String,

    /// Required report structure, as free text
    #[arg(short, long)]
    structure: String,

    /// Write sections one at a time instead of concurrently
    #[arg(long)]
    throttle: bool,

    /// Join sections directly instead of asking the model to smooth them
    #[arg(long)]
    concatenate: bool,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<String>,

    /// Log level for docgen targets (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: Level,
}

fn load_env_files() -> Vec<(&'static str, Result<(), dotenvy::Error>)> {
    ENV_FILES
        .into_iter()
        .map(|file| (file, dotenvy::from_filename(file).map(|_| ())))
        .collect()
}

fn init_logging(cli: &Cli) -> Result<()> {
    let target = cli.log_file.clone().map(LogTarget::File).unwrap_or_default();
    let config = ObservabilityConfig::default()
        .with_level(cli.log_level)
        .with_target(target);

    observability::init(config)
        .map_err(|e| anyhow::anyhow!(e))
        .context("failed to initialize logging")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let env_results = load_env_files();

    init_logging(&cli)?;

    for (file, result) in env_results {
        match result {
            Ok(()) => tracing::info!(file, "Loaded environment file"),
            Err(e) if e.not_found() => tracing::debug!(file, "Environment file not found"),
            Err(e) => tracing::warn!(file, error = %e, "Failed to load environment file"),
        }
    }

    let mut config = WorkflowConfig::from_env();
    if cli.throttle {
        config = config.with_throttled_sections(true);
    }
    if cli.concatenate {
        config = config.with_compile_mode(CompileMode::Concatenate);
    }

    let search = TavilySearch::try_from_env().context("search backend is not configured")?;
    let completion = OpenAiCompletion::try_from_env().context("model backend is not configured")?;

    let workflow = ReportWorkflow::with_config(Arc::new(search), Arc::new(completion), config);
    let report = workflow
        .generate_report(&cli.topic, &cli.structure)
        .await
        .with_context(|| format!("report generation for '{}' failed", cli.topic))?;

    match cli.output {
        Some(path) => {
            std::fs::write(&path, &report)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "Report written");
        }
        None => println!("{}", report),
    }

    Ok(())
}
