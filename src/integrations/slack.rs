//! Slack incoming-webhook notifications.

use std::time::Duration;

use serde::Serialize;
use tracing::info;

use super::{confidence_label, diagnosis_label, ensure_success, IntegrationError};
use crate::analysis::Analysis;
use crate::config::SlackConfig;
use crate::credentials::{Credentials, SLACK_WEBHOOK};

#[derive(Debug, Serialize)]
struct SlackMessage<'a> {
    text: &'a str,
}

/// Render the Slack message text for an analysis.
pub fn build_message(
    analysis: &Analysis,
    build_url: Option<&str>,
    pull_request: Option<&str>,
) -> String {
    let mut text = format!(
        "*AI diagnosis*: {}\n*Confidence*: {}\n",
        diagnosis_label(analysis),
        confidence_label(analysis)
    );
    if let Some(url) = build_url {
        text.push_str(&format!("<{url}|Open build>\n"));
    }
    if analysis.patch().is_some() {
        text.push_str("Suggested pipeline patch available.\n");
    }
    if let Some(pr) = pull_request {
        text.push_str(&format!("<{pr}|Pull request>\n"));
    }
    text
}

/// Posts messages to a Slack incoming webhook.
#[derive(Clone)]
pub struct SlackNotifier {
    client: reqwest::Client,
    webhook: String,
    timeout: Duration,
}

impl std::fmt::Debug for SlackNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackNotifier")
            .field("webhook", &"[REDACTED]")
            .finish()
    }
}

impl SlackNotifier {
    /// Build a notifier when `SLACK_WEBHOOK` is set.
    pub fn from_config(
        client: reqwest::Client,
        config: &SlackConfig,
        credentials: &Credentials,
    ) -> Option<Self> {
        Some(Self {
            client,
            webhook: credentials.get(SLACK_WEBHOOK)?.to_owned(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// Post `text` to the webhook.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn notify(&self, text: &str) -> Result<(), IntegrationError> {
        let response = self
            .client
            .post(&self.webhook)
            .timeout(self.timeout)
            .json(&SlackMessage { text })
            .send()
            .await?;
        ensure_success("Slack webhook", response).await?;
        info!("Slack notification sent");
        Ok(())
    }
}
