//! Side-effect collaborators run after a successful analysis.
//!
//! Each client is built only when its credentials are present, so a missing
//! integration is an absent `Option` rather than an error at call time.

use crate::analysis::Analysis;
use crate::providers::sanitize_http_error_body;

pub mod github;
pub mod jenkins;
pub mod slack;

pub use github::GithubClient;
pub use jenkins::JenkinsClient;
pub use slack::SlackNotifier;

/// Errors from the Jenkins, Slack and GitHub clients.
#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    /// HTTP transport failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The remote returned a non-success status.
    #[error("{action} returned status {status}: {body}")]
    Status {
        /// What was being attempted.
        action: &'static str,
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
    /// A URL or setting could not be used.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Fail with [`IntegrationError::Status`] unless `response` is a success.
pub(crate) async fn ensure_success(
    action: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, IntegrationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(IntegrationError::Status {
        action,
        status: status.as_u16(),
        body: sanitize_http_error_body(&body),
    })
}

/// Escape text for inclusion in HTML, quotes included.
pub fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Diagnosis text for messages, `"No diagnosis"` when absent.
pub(crate) fn diagnosis_label(analysis: &Analysis) -> &str {
    analysis.diagnosis.as_deref().unwrap_or("No diagnosis")
}

/// Confidence text for messages, `"None"` when absent.
pub(crate) fn confidence_label(analysis: &Analysis) -> String {
    analysis
        .confidence
        .map_or_else(|| "None".to_owned(), |c| format!("{c:?}"))
}
