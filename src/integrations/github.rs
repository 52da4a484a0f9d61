//! Opens a pull request carrying a suggested pipeline file.

use std::time::Duration;

use base64::Engine;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use super::{ensure_success, IntegrationError};
use crate::config::Config;
use crate::credentials::{Credentials, GITHUB_TOKEN};

/// Commit message of the suggested-pipeline commit.
pub const COMMIT_MESSAGE: &str = "chore(ci): AI suggested pipeline";

/// Title of the opened pull request.
pub const PR_TITLE: &str = "AI suggested pipeline improvements";

/// Branch name for a suggestion created at `unix_ts`.
pub fn branch_name(unix_ts: i64) -> String {
    format!("ai-suggest-{unix_ts}")
}

/// Pull request body naming the assistant that opened it.
pub fn pr_body(owner: &str) -> String {
    format!("Automated suggestion from {owner}: suggested pipeline changes.")
}

#[derive(Debug, Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    html_url: String,
}

/// GitHub REST client scoped to one repository.
#[derive(Clone)]
pub struct GithubClient {
    client: reqwest::Client,
    token: String,
    owner: String,
    name: String,
    base_branch: String,
    patch_path: String,
    api_base: String,
    owner_tag: String,
    timeout: Duration,
}

impl std::fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubClient")
            .field("repo", &format!("{}/{}", self.owner, self.name))
            .field("base_branch", &self.base_branch)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl GithubClient {
    /// Build a client when `GITHUB_TOKEN` and `github.repo` are set.
    ///
    /// A repo that is not of the form `owner/name` disables the client.
    pub fn from_config(
        client: reqwest::Client,
        config: &Config,
        credentials: &Credentials,
    ) -> Option<Self> {
        let token = credentials.get(GITHUB_TOKEN)?.to_owned();
        let repo = config.github.repo.as_deref()?;
        let Some((owner, name)) = split_repo(repo) else {
            warn!(repo, "github.repo must be owner/name, pull requests disabled");
            return None;
        };

        Some(Self {
            client,
            token,
            owner: owner.to_owned(),
            name: name.to_owned(),
            base_branch: config.github.base_branch.clone(),
            patch_path: config.github.patch_path.clone(),
            api_base: config.github.api_base.trim_end_matches('/').to_owned(),
            owner_tag: config.owner.clone(),
            timeout: Duration::from_secs(config.github.timeout_secs),
        })
    }

    /// Commit `patch` on a fresh branch and open a pull request.
    ///
    /// Returns the pull request's HTML URL.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the REST calls fails.
    pub async fn create_pull_request(&self, patch: &str) -> Result<String, IntegrationError> {
        let base_sha = self.base_sha().await?;
        let branch = self.create_branch(&base_sha).await?;
        self.put_file(&branch, patch).await?;

        let response = self
            .request(reqwest::Method::POST, &["pulls"])?
            .json(&json!({
                "title": PR_TITLE,
                "head": branch,
                "base": self.base_branch,
                "body": pr_body(&self.owner_tag),
            }))
            .send()
            .await?;
        let pr: PullRequest = ensure_success("create pull request", response)
            .await?
            .json()
            .await?;
        info!(url = %pr.html_url, branch = %branch, "opened pull request");
        Ok(pr.html_url)
    }

    async fn base_sha(&self) -> Result<String, IntegrationError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &["git", "ref", "heads", &self.base_branch],
            )?
            .send()
            .await?;
        let git_ref: GitRef = ensure_success("fetch base ref", response)
            .await?
            .json()
            .await?;
        Ok(git_ref.object.sha)
    }

    async fn create_branch(&self, base_sha: &str) -> Result<String, IntegrationError> {
        let branch = branch_name(chrono::Utc::now().timestamp());
        let response = self.post_ref(&branch, base_sha).await?;
        if response.status() != StatusCode::UNPROCESSABLE_ENTITY {
            ensure_success("create branch", response).await?;
            return Ok(branch);
        }

        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let retry = format!("{branch}-{}", suffix.get(..8).unwrap_or(&suffix));
        warn!(branch = %branch, retry = %retry, "branch exists, retrying with suffix");
        ensure_success("create branch", self.post_ref(&retry, base_sha).await?).await?;
        Ok(retry)
    }

    async fn post_ref(
        &self,
        branch: &str,
        sha: &str,
    ) -> Result<reqwest::Response, IntegrationError> {
        Ok(self
            .request(reqwest::Method::POST, &["git", "refs"])?
            .json(&json!({ "ref": format!("refs/heads/{branch}"), "sha": sha }))
            .send()
            .await?)
    }

    async fn put_file(&self, branch: &str, patch: &str) -> Result<(), IntegrationError> {
        let mut segments = vec!["contents"];
        segments.extend(self.patch_path.split('/').filter(|s| !s.is_empty()));
        let content = base64::engine::general_purpose::STANDARD.encode(patch.as_bytes());

        let response = self
            .request(reqwest::Method::PUT, &segments)?
            .json(&json!({
                "message": COMMIT_MESSAGE,
                "content": content,
                "branch": branch,
            }))
            .send()
            .await?;
        ensure_success("create file", response).await?;
        Ok(())
    }

    fn request(
        &self,
        method: reqwest::Method,
        segments: &[&str],
    ) -> Result<reqwest::RequestBuilder, IntegrationError> {
        let url = repo_url(&self.api_base, &self.owner, &self.name, segments)?;
        Ok(self
            .client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .timeout(self.timeout))
    }
}

/// Split `owner/name`, rejecting empty parts.
pub fn split_repo(repo: &str) -> Option<(&str, &str)> {
    let (owner, name) = repo.trim().split_once('/')?;
    (!owner.is_empty() && !name.is_empty() && !name.contains('/')).then_some((owner, name))
}

/// `{api_base}/repos/{owner}/{name}/{segments..}` with each segment escaped.
pub fn repo_url(
    api_base: &str,
    owner: &str,
    name: &str,
    segments: &[&str],
) -> Result<Url, IntegrationError> {
    let mut url = Url::parse(api_base).map_err(|e| IntegrationError::Config(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| IntegrationError::Config(format!("{api_base} cannot be a base URL")))?
        .pop_if_empty()
        .extend(["repos", owner, name])
        .extend(segments);
    Ok(url)
}
