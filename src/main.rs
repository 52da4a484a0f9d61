//! `ci-assistant` entry point.
//!
//! `serve` runs the webhook server; `extract`, `process` and
//! `generate-pipeline` are one-shot helpers for local use.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use ci_assistant::config::Config;
use ci_assistant::credentials::load_runtime_credentials;
use ci_assistant::extract::{ExtractionPolicy, DEFAULT_MAX_BLOCKS};
use ci_assistant::manifest::{self, PipelineTarget};
use ci_assistant::pipeline::Pipeline;
use ci_assistant::{logging, server};

/// CI failure assistant.
#[derive(Parser)]
#[command(name = "ci-assistant", version, about)]
struct Cli {
    /// Config file (default: `$CI_ASSISTANT_CONFIG` or `./ci-assistant.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Secrets file read before the process environment.
    #[arg(long, global = true, default_value = ".env")]
    env_file: PathBuf,

    /// Debug logging for one-shot subcommands.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Extraction policy names accepted on the command line.
#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Multi-pattern blocks plus summary.
    Blocks,
    /// Most recent failure marker.
    RecentMarker,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Run the webhook server.
    Serve,
    /// Print the snippet a log file reduces to. No network access.
    Extract {
        /// Log file to read.
        file: PathBuf,
        /// Extraction policy.
        #[arg(long, value_enum, default_value_t = PolicyArg::RecentMarker)]
        policy: PolicyArg,
        /// Block cap for the `blocks` policy.
        #[arg(long, default_value_t = DEFAULT_MAX_BLOCKS)]
        max_blocks: usize,
    },
    /// Process one webhook payload synchronously and print the outcome.
    Process {
        /// JSON payload file.
        payload: PathBuf,
    },
    /// Ask the model for a CI pipeline suited to a repository.
    GeneratePipeline {
        /// Repository root.
        #[arg(long, default_value = ".")]
        path: PathBuf,
        /// Pipeline flavour.
        #[arg(long, value_enum, default_value_t = PipelineTarget::Github)]
        target: PipelineTarget,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => handle_serve(cli.config.as_deref(), &cli.env_file).await,
        Command::Extract {
            file,
            policy,
            max_blocks,
        } => {
            logging::init_cli(cli.verbose);
            handle_extract(&file, policy, max_blocks)
        }
        Command::Process { payload } => {
            logging::init_cli(cli.verbose);
            handle_process(cli.config.as_deref(), &cli.env_file, &payload).await
        }
        Command::GeneratePipeline { path, target } => {
            logging::init_cli(cli.verbose);
            handle_generate(cli.config.as_deref(), &cli.env_file, &path, target).await
        }
    }
}

fn load_pipeline(config: &Config, env_file: &Path) -> anyhow::Result<Pipeline> {
    let credentials = load_runtime_credentials(env_file)
        .with_context(|| format!("failed to load {}", env_file.display()))?;
    Pipeline::from_config(config, &credentials)
}

async fn handle_serve(config_path: Option<&Path>, env_file: &Path) -> anyhow::Result<()> {
    let config = Config::load(config_path)?;
    let _logging_guard = logging::init_server(config.server.logs_dir.as_deref())?;

    let pipeline = load_pipeline(&config, env_file)?;
    info!(
        model = pipeline.analyzer().model_id(),
        policy = ?config.extraction.policy,
        "pipeline ready"
    );
    server::serve(&config.server, Arc::new(pipeline)).await
}

fn handle_extract(file: &Path, policy: PolicyArg, max_blocks: usize) -> anyhow::Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let log = String::from_utf8_lossy(&bytes);

    let policy = match policy {
        PolicyArg::Blocks => ExtractionPolicy::Blocks { max_blocks },
        PolicyArg::RecentMarker => ExtractionPolicy::RecentMarker,
    };
    println!("{}", policy.apply(&log));
    Ok(())
}

async fn handle_process(
    config_path: Option<&Path>,
    env_file: &Path,
    payload_path: &Path,
) -> anyhow::Result<()> {
    let config = Config::load(config_path)?;
    let text = std::fs::read_to_string(payload_path)
        .with_context(|| format!("failed to read {}", payload_path.display()))?;
    let payload: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", payload_path.display()))?;

    let pipeline = load_pipeline(&config, env_file)?;
    let outcome = pipeline.process(&payload).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn handle_generate(
    config_path: Option<&Path>,
    env_file: &Path,
    repo: &Path,
    target: PipelineTarget,
) -> anyhow::Result<()> {
    let config = Config::load(config_path)?;
    let files = manifest::inspect_repo(repo)
        .with_context(|| format!("failed to inspect {}", repo.display()))?;
    if files.is_empty() {
        info!(path = %repo.display(), "no known build files found");
    }

    let pipeline = load_pipeline(&config, env_file)?;
    let generated = manifest::generate_pipeline(pipeline.analyzer(), &files, target)
        .await
        .context("pipeline generation failed")?;
    match generated {
        Some(text) => println!("{text}"),
        None => anyhow::bail!("model returned neither a pipeline nor text"),
    }
    Ok(())
}
