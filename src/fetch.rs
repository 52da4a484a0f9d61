//! Fetches build logs that the webhook payload did not carry.
//!
//! Every failure here degrades to an empty string; the orchestrator then
//! reports the event as having no logs.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::{Config, JenkinsConfig};
use crate::credentials::{Credentials, GITHUB_TOKEN, JENKINS_API_TOKEN};
use crate::event::{CanonicalEvent, EventSource};
use crate::integrations::github::{repo_url, split_repo};

/// Timeout for the Jenkins `consoleText` download.
pub const CONSOLE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct JobList {
    #[serde(default)]
    jobs: Vec<Job>,
}

#[derive(Debug, Deserialize)]
struct Job {
    id: u64,
    #[serde(default)]
    name: String,
    conclusion: Option<String>,
}

/// Log downloader for Jenkins and GitHub Actions.
#[derive(Clone)]
pub struct LogFetcher {
    client: reqwest::Client,
    jenkins: JenkinsConfig,
    jenkins_auth: Option<(String, String)>,
    github_token: Option<String>,
    github_api_base: String,
    github_timeout: Duration,
}

impl std::fmt::Debug for LogFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogFetcher")
            .field("jenkins_auth", &self.jenkins_auth.is_some())
            .field("github_token", &self.github_token.is_some())
            .field("github_api_base", &self.github_api_base)
            .finish()
    }
}

impl LogFetcher {
    /// Create a fetcher from configuration and secrets.
    pub fn new(client: reqwest::Client, config: &Config, credentials: &Credentials) -> Self {
        let jenkins_auth = config
            .jenkins
            .user
            .clone()
            .zip(credentials.get(JENKINS_API_TOKEN).map(str::to_owned));

        Self {
            client,
            jenkins: config.jenkins.clone(),
            jenkins_auth,
            github_token: credentials.get(GITHUB_TOKEN).map(str::to_owned),
            github_api_base: config.github.api_base.trim_end_matches('/').to_owned(),
            github_timeout: Duration::from_secs(config.github.timeout_secs),
        }
    }

    /// Fetch the log for `event`, or `""` when it cannot be obtained.
    pub async fn fetch(&self, event: &CanonicalEvent) -> String {
        match event.source {
            EventSource::Jenkins => match event.url.as_deref() {
                Some(url) => self.jenkins_console(url).await,
                None => String::new(),
            },
            EventSource::Github => self.github_failed_jobs(&event.metadata).await,
            EventSource::Unknown => String::new(),
        }
    }

    async fn jenkins_console(&self, build_url: &str) -> String {
        let console_url = format!("{}/consoleText", build_url.trim_end_matches('/'));
        let mut request = self
            .client
            .get(&console_url)
            .timeout(Duration::from_secs(CONSOLE_TIMEOUT_SECS));
        match &self.jenkins_auth {
            Some((user, token)) if self.jenkins.is_own_origin(&console_url) => {
                request = request.basic_auth(user, Some(token));
            }
            Some(_) => debug!(
                url = %console_url,
                "build URL is outside the configured Jenkins, fetching without auth"
            ),
            None => {}
        }

        let result = async {
            request
                .send()
                .await?
                .error_for_status()?
                .text()
                .await
        }
        .await;

        match result {
            Ok(text) => {
                debug!(url = %console_url, bytes = text.len(), "fetched Jenkins console");
                text
            }
            Err(e) => {
                warn!(url = %console_url, error = %e, "Jenkins console fetch failed");
                String::new()
            }
        }
    }

    async fn github_failed_jobs(&self, payload: &Value) -> String {
        let Some(token) = self.github_token.as_deref() else {
            debug!("GITHUB_TOKEN not set, skipping workflow log fetch");
            return String::new();
        };
        let run = payload.get("workflow_run");
        let run_id = run.and_then(|r| r.get("id")).and_then(Value::as_u64);
        let full_name = payload
            .pointer("/repository/full_name")
            .or_else(|| run.and_then(|r| r.pointer("/repository/full_name")))
            .and_then(Value::as_str);
        let (Some(run_id), Some((owner, name))) = (run_id, full_name.and_then(split_repo)) else {
            debug!("workflow_run payload lacks a run id or repository name");
            return String::new();
        };

        // Only the configured API base ever receives the token.
        let run_id = run_id.to_string();
        let Some(jobs_url) = self.github_url(owner, name, &["actions", "runs", &run_id, "jobs"])
        else {
            return String::new();
        };

        let jobs = match self.github_get(jobs_url.clone(), token).await {
            Ok(response) => match response.json::<JobList>().await {
                Ok(list) => list.jobs,
                Err(e) => {
                    warn!(error = %e, "could not decode workflow job list");
                    return String::new();
                }
            },
            Err(e) => {
                warn!(url = %jobs_url, error = %e, "workflow job list fetch failed");
                return String::new();
            }
        };

        let mut logs = Vec::new();
        for job in jobs
            .iter()
            .filter(|job| job.conclusion.as_deref() == Some("failure"))
        {
            let job_id = job.id.to_string();
            let Some(url) = self.github_url(owner, name, &["actions", "jobs", &job_id, "logs"])
            else {
                continue;
            };
            let text = match self.github_get(url, token).await {
                Ok(response) => response.text().await,
                Err(e) => Err(e),
            };
            match text {
                Ok(text) => {
                    debug!(job = %job.name, id = job.id, bytes = text.len(), "fetched job log");
                    logs.push(text);
                }
                Err(e) => warn!(job = %job.name, id = job.id, error = %e, "job log fetch failed"),
            }
        }
        logs.join("\n")
    }

    fn github_url(&self, owner: &str, name: &str, segments: &[&str]) -> Option<Url> {
        match repo_url(&self.github_api_base, owner, name, segments) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(error = %e, "invalid GitHub API base");
                None
            }
        }
    }

    async fn github_get(&self, url: Url, token: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .get(url)
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .timeout(self.github_timeout)
            .send()
            .await?
            .error_for_status()
    }
}
