//! Tracing subscriber setup.
//!
//! - **Server** ([`init_server`]): stderr output, plus a JSON file layer with
//!   daily rotation when `server.logs_dir` is configured.
//! - **CLI** ([`init_cli`]): stderr only, so stdout stays clean for the
//!   snippet or JSON a subcommand prints.
//!
//! Both honour `RUST_LOG`.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// File name prefix of the rotated JSON log.
pub const LOG_FILE_PREFIX: &str = "ci-assistant.log";

/// Keeps the non-blocking file writer alive; dropping it flushes the log.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initialise logging for `serve`.
///
/// With a `logs_dir`, JSON records go to `{logs_dir}/ci-assistant.log.YYYY-MM-DD`
/// in addition to stderr. Default level is `info`.
///
/// # Errors
///
/// Returns an error if the logs directory cannot be created or a global
/// subscriber is already installed.
pub fn init_server(logs_dir: Option<&Path>) -> anyhow::Result<Option<LoggingGuard>> {
    let Some(dir) = logs_dir else {
        tracing_subscriber::registry()
            .with(env_filter("info"))
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .context("failed to install tracing subscriber")?;
        return Ok(None);
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create logs directory {}", dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_writer(non_blocking);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(json_layer)
        .with(console_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(Some(LoggingGuard { _guard: guard }))
}

/// Initialise stderr-only logging for one-shot subcommands.
///
/// Default level is `warn` unless `verbose` is set.
pub fn init_cli(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default))
        .with_writer(std::io::stderr)
        .init();
}
