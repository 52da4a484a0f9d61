//! Event orchestrator: normalize, fetch, extract, redact, analyze, report.

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::analysis::{Analysis, Analyzer};
use crate::config::Config;
use crate::credentials::Credentials;
use crate::event::{normalize, CanonicalEvent, EventSource};
use crate::extract::Extractor;
use crate::fetch::LogFetcher;
use crate::integrations::{slack, GithubClient, JenkinsClient, SlackNotifier};
use crate::providers::{self, LlmProvider};
use crate::redactor::Redactor;

/// Result of processing one webhook payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProcessOutcome {
    /// No log text was embedded or could be fetched.
    NoLogs,
    /// Extraction or analysis failed.
    Failed {
        /// Human-readable cause.
        error: String,
    },
    /// The model produced an analysis.
    Analyzed {
        /// The diagnosis.
        analysis: Analysis,
        /// Whether the Jenkins build description was updated.
        jenkins_posted: bool,
        /// Whether the Slack notification was delivered.
        slack_notified: bool,
        /// URL of the suggested-pipeline pull request, if one was opened.
        pull_request: Option<String>,
    },
}

/// Wires every stage together. Cheap to share behind an [`Arc`].
#[derive(Debug)]
pub struct Pipeline {
    extractor: Extractor,
    redactor: Redactor,
    analyzer: Analyzer,
    fetcher: LogFetcher,
    jenkins: Option<JenkinsClient>,
    slack: Option<SlackNotifier>,
    github: Option<GithubClient>,
}

impl Pipeline {
    /// Build a pipeline around an explicit provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: &Config,
        credentials: &Credentials,
        provider: Arc<dyn LlmProvider>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ci-assistant/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            extractor: config.extraction.extractor(),
            redactor: Redactor::new(credentials.known_secrets()),
            analyzer: Analyzer::new(provider, &config.llm),
            fetcher: LogFetcher::new(client.clone(), config, credentials),
            jenkins: JenkinsClient::from_config(client.clone(), &config.jenkins, credentials),
            slack: SlackNotifier::from_config(client.clone(), &config.slack, credentials),
            github: GithubClient::from_config(client, config, credentials),
        })
    }

    /// Build a pipeline with the provider selected by `[llm]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider's API key is missing.
    pub fn from_config(config: &Config, credentials: &Credentials) -> anyhow::Result<Self> {
        let provider = providers::from_config(&config.llm, credentials)
            .context("failed to initialise LLM provider")?;
        Self::new(config, credentials, provider)
    }

    /// The analyzer, for callers that query the model directly.
    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Process one raw webhook payload end to end.
    pub async fn process(&self, payload: &Value) -> ProcessOutcome {
        let mut event = normalize(payload);
        info!(
            source = %event.source,
            url = ?event.url,
            status = ?event.status,
            log_len = event.logs.len(),
            "processing event"
        );

        if !event.has_logs() {
            event.logs = self.fetcher.fetch(&event).await;
        }
        if !event.has_logs() {
            info!(source = %event.source, "no logs found, skipping analysis");
            return ProcessOutcome::NoLogs;
        }

        let snippet = match self.extractor.extract(&event.logs) {
            Ok(snippet) => snippet,
            Err(e) => {
                warn!(error = %e, "log extraction rejected input");
                return ProcessOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };
        let snippet = self.redactor.redact(&snippet);
        debug!(
            policy = ?self.extractor.policy(),
            snippet_len = snippet.len(),
            "snippet extracted"
        );

        let analysis = match self.analyzer.analyze(&snippet, None).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(error = %e, "analysis failed");
                return ProcessOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };
        if analysis.is_raw_only() {
            info!("model returned raw text, not JSON");
        }
        info!(
            diagnosis = ?analysis.diagnosis,
            confidence = ?analysis.confidence,
            fixes = analysis.fixes.len(),
            "analysis complete"
        );

        self.report(&event, analysis).await
    }

    async fn report(&self, event: &CanonicalEvent, analysis: Analysis) -> ProcessOutcome {
        let build_url = event.url.as_deref();

        let jenkins_posted = match (&self.jenkins, event.source, build_url) {
            (Some(jenkins), EventSource::Jenkins, Some(url)) => {
                match jenkins.post_description(url, &analysis).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "Jenkins post-back failed");
                        false
                    }
                }
            }
            _ => {
                debug!("Jenkins post-back skipped");
                false
            }
        };

        let slack_notified = self
            .notify(&slack::build_message(&analysis, build_url, None))
            .await;

        let pull_request = match (&self.github, analysis.patch()) {
            (Some(github), Some(patch)) => match github.create_pull_request(patch).await {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(error = %e, "pull request creation failed");
                    None
                }
            },
            _ => None,
        };

        if let Some(pr) = pull_request.as_deref() {
            let follow_up = Analysis {
                diagnosis: analysis.diagnosis.clone(),
                confidence: analysis.confidence,
                ..Analysis::default()
            };
            self.notify(&slack::build_message(&follow_up, build_url, Some(pr)))
                .await;
        }

        ProcessOutcome::Analyzed {
            analysis,
            jenkins_posted,
            slack_notified,
            pull_request,
        }
    }

    async fn notify(&self, text: &str) -> bool {
        let Some(slack) = &self.slack else {
            return false;
        };
        match slack.notify(text).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Slack notify failed");
                false
            }
        }
    }
}
