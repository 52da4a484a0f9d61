//! HTTP surface for CI webhooks.
//!
//! # Endpoints
//!
//! - `POST /webhook` - accepts a build notification (returns 202 Accepted)
//! - `GET /health` - returns 200 while the server is running
//!
//! Each accepted webhook is processed on a task tracked by a
//! [`TaskTracker`]. Shutdown cancels the shared [`CancellationToken`], which
//! interrupts in-flight processing, then waits for the tasks to finish.

use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn, Instrument, Span};

use crate::config::ServerConfig;
use crate::pipeline::{Pipeline, ProcessOutcome};

pub mod health;
pub mod webhook;

pub use health::health_handler;
pub use webhook::webhook_handler;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pipeline: Arc<Pipeline>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl AppState {
    /// Create state around a pipeline.
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pipeline,
                tracker: TaskTracker::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Process `payload` in the background under `span`.
    ///
    /// The task stops early when [`AppState::shutdown`] is triggered.
    pub fn dispatch(&self, payload: Value, span: Span) {
        let pipeline = Arc::clone(&self.inner.pipeline);
        let token = self.inner.shutdown.clone();
        self.inner.tracker.spawn(
            async move {
                tokio::select! {
                    outcome = pipeline.process(&payload) => log_outcome(&outcome),
                    () = token.cancelled() => warn!("processing cancelled by shutdown"),
                }
            }
            .instrument(span),
        );
    }

    /// Number of processing tasks still running.
    pub fn in_flight(&self) -> usize {
        self.inner.tracker.len()
    }

    /// Cancel in-flight processing and wait for every task to exit.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
    }

    /// Wait for all dispatched tasks to finish without cancelling them.
    pub async fn drain(&self) {
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        self.inner.tracker.reopen();
    }
}

fn log_outcome(outcome: &ProcessOutcome) {
    match outcome {
        ProcessOutcome::NoLogs => info!("event had no logs"),
        ProcessOutcome::Failed { error } => warn!(%error, "event processing failed"),
        ProcessOutcome::Analyzed {
            jenkins_posted,
            slack_notified,
            pull_request,
            ..
        } => info!(
            jenkins_posted,
            slack_notified,
            pull_request = ?pull_request,
            "event processed"
        ),
    }
}

/// Build the router with all endpoints and the body size limit.
pub fn build_router(app_state: AppState, max_body_bytes: usize) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(app_state)
}

/// Serve until Ctrl-C, then cancel and drain background processing.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(config: &ServerConfig, pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    let app_state = AppState::new(pipeline);
    let router = build_router(app_state.clone(), config.max_body_bytes);

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(addr = %listener.local_addr()?, "webhook server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl-C, serving until killed");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await
        .context("server error")?;

    let pending = app_state.in_flight();
    if pending > 0 {
        info!(pending, "cancelling in-flight processing");
    }
    app_state.shutdown().await;
    info!("server stopped");
    Ok(())
}
