//! Jenkins build-description post-back.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use super::{confidence_label, diagnosis_label, ensure_success, html_escape, IntegrationError};
use crate::analysis::Analysis;
use crate::config::JenkinsConfig;
use crate::credentials::{Credentials, JENKINS_API_TOKEN};

/// Fixes listed in the description.
pub const MAX_LISTED_FIXES: usize = 5;

/// Timeout for the CSRF crumb request.
pub const CRUMB_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Crumb {
    crumb_request_field: String,
    crumb: String,
}

/// Render the HTML build description for an analysis.
pub fn build_description(analysis: &Analysis) -> String {
    let fixes = if analysis.fixes.is_empty() {
        String::new()
    } else {
        let items: String = analysis
            .fixes
            .iter()
            .take(MAX_LISTED_FIXES)
            .map(|fix| format!("<li>{}</li>", html_escape(fix)))
            .collect();
        format!("<ul>{items}</ul>")
    };

    format!(
        "AI diagnosis: {}<br/>Confidence: {}<br/>{fixes}",
        html_escape(diagnosis_label(analysis)),
        html_escape(&confidence_label(analysis)),
    )
}

/// Authenticated Jenkins client.
#[derive(Clone)]
pub struct JenkinsClient {
    client: reqwest::Client,
    user: String,
    token: String,
    timeout: Duration,
}

impl std::fmt::Debug for JenkinsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JenkinsClient")
            .field("user", &self.user)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl JenkinsClient {
    /// Build a client when both `jenkins.user` and `JENKINS_API_TOKEN` are set.
    pub fn from_config(
        client: reqwest::Client,
        config: &JenkinsConfig,
        credentials: &Credentials,
    ) -> Option<Self> {
        let user = config.user.clone().filter(|u| !u.trim().is_empty())?;
        let token = credentials.get(JENKINS_API_TOKEN)?.to_owned();
        Some(Self {
            client,
            user,
            token,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// Set the build description of `build_url` from `analysis`.
    ///
    /// A crumb is requested first; failing to get one is not an error since
    /// API-token requests are usually exempt from CSRF checks.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the description submit fails.
    pub async fn post_description(
        &self,
        build_url: &str,
        analysis: &Analysis,
    ) -> Result<(), IntegrationError> {
        let base = build_base(build_url)?;
        let crumb_url = base
            .join("../crumbIssuer/api/json")
            .map_err(|e| IntegrationError::Config(e.to_string()))?;
        let submit_url = base
            .join("submitDescription")
            .map_err(|e| IntegrationError::Config(e.to_string()))?;

        let mut request = self
            .client
            .post(submit_url.clone())
            .basic_auth(&self.user, Some(&self.token))
            .timeout(self.timeout)
            .form(&[("description", build_description(analysis))]);
        match self.fetch_crumb(crumb_url).await {
            Ok(crumb) => request = request.header(crumb.crumb_request_field, crumb.crumb),
            Err(e) => debug!(error = %e, "Jenkins crumb fetch failed, continuing without"),
        }

        ensure_success("Jenkins submitDescription", request.send().await?).await?;
        info!(url = %submit_url, "posted analysis to Jenkins build description");
        Ok(())
    }

    async fn fetch_crumb(&self, url: Url) -> Result<Crumb, IntegrationError> {
        let response = self
            .client
            .get(url)
            .basic_auth(&self.user, Some(&self.token))
            .timeout(Duration::from_secs(CRUMB_TIMEOUT_SECS))
            .send()
            .await?;
        Ok(ensure_success("Jenkins crumb", response)
            .await?
            .json()
            .await?)
    }
}

/// Parse a build URL, guaranteeing a trailing slash for relative joins.
pub fn build_base(build_url: &str) -> Result<Url, IntegrationError> {
    let with_slash = if build_url.ends_with('/') {
        build_url.to_owned()
    } else {
        format!("{build_url}/")
    };
    Url::parse(&with_slash).map_err(|e| IntegrationError::Config(format!("{build_url}: {e}")))
}
