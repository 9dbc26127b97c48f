//! semkon - check the informal proofs written in a repository
//!
//! Scans a directory for natural-language propositions with proofs, asks a
//! language model to judge each proof, and prints one record per proposition.
//! Exits 0 only when every proof is judged correct.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use semkon_core::{NoProgress, Oracle, Report, ScanOptions, ScanProgress, Scanner};
use semkon_model_anthropic::AnthropicOracle;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod output;
mod progress;

use config::CliConfig;
use output::OutputFormat;
use progress::BarProgress;

/// semkon CLI
#[derive(Parser, Debug)]
#[command(name = "semkon")]
#[command(about = "Check the natural-language proofs written in a repository", long_about = None)]
#[command(version)]
struct Cli {
    /// Repository root to scan
    #[arg(default_value = ".")]
    directory: PathBuf,

    /// Gitignore-style pattern of paths to skip (repeatable)
    #[arg(long = "filter-path", value_name = "PATTERN")]
    filter_paths: Vec<String>,

    /// Only check propositions matching this natural-language description
    #[arg(long, value_name = "TEXT")]
    property_filter: Option<String>,

    /// Concurrent proof checks
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Configuration file path
    #[arg(short, long, env = "SEMKON_CONFIG")]
    config: Option<String>,

    /// Report format
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Model used to extract propositions
    #[arg(long)]
    extract_model: Option<String>,

    /// Model used to check proofs
    #[arg(long)]
    check_model: Option<String>,

    /// Do not offer web search and fetch to the checker
    #[arg(long)]
    no_web_tools: bool,

    /// Log level
    #[arg(long, env = "SEMKON_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "SEMKON_LOG_JSON")]
    log_json: bool,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    /// Explicit flags win over file and environment settings.
    fn apply(&self, config: &mut CliConfig) {
        config.filter_paths.extend(self.filter_paths.iter().cloned());
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(model) = &self.extract_model {
            config.anthropic.extract_model = model.clone();
        }
        if let Some(model) = &self.check_model {
            config.anthropic.check_model = model.clone();
        }
        if self.no_web_tools {
            config.anthropic.web_tools = false;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    let bar = (!cli.no_progress).then(|| Arc::new(BarProgress::new()));
    match run(&cli, bar.clone()).await {
        Ok(report) if report.all_correct() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            if let Some(bar) = &bar {
                bar.clear();
            }
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(cli: &Cli) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .without_time()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

async fn run(cli: &Cli, bar: Option<Arc<BarProgress>>) -> anyhow::Result<Report> {
    let mut config =
        CliConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply(&mut config);

    let oracle: Arc<dyn Oracle> = Arc::new(
        AnthropicOracle::new(config.anthropic.clone())
            .context("invalid anthropic configuration")?,
    );
    let progress: Arc<dyn ScanProgress> = match bar {
        Some(bar) => bar as Arc<dyn ScanProgress>,
        None => Arc::new(NoProgress),
    };

    let options = ScanOptions {
        filter_paths: config.filter_paths.clone(),
        topic_filter: cli.property_filter.clone(),
        concurrency: config.concurrency,
    };
    info!(
        root = %cli.directory.display(),
        concurrency = options.concurrency,
        extract_model = %config.anthropic.extract_model,
        check_model = %config.anthropic.check_model,
        "starting scan"
    );

    let report = Scanner::new(oracle, options)
        .with_progress(progress)
        .run(&cli.directory)
        .await
        .with_context(|| format!("scan of {} failed", cli.directory.display()))?;
    info!("{}", output::summary(&report));

    print!("{}", output::render(&report, config.format)?);
    Ok(report)
}
