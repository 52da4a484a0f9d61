//! Configuration loading.
//!
//! Settings come from `ci-assistant.toml` (or the path given by `--config` /
//! `$CI_ASSISTANT_CONFIG`), overlaid by environment variables. Every section
//! is `#[serde(default)]`, so a missing or empty file yields a working
//! configuration.
//!
//! Precedence: env vars > config file > defaults.
//!
//! Secrets are not part of this struct; see [`crate::credentials`].

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::extract::{ExtractionPolicy, Extractor, PolicyKind, DEFAULT_MAX_BLOCKS, DEFAULT_MAX_INPUT_BYTES};

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "ci-assistant.toml";

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "CI_ASSISTANT_CONFIG";

// ── Top-level config ────────────────────────────────────────────

/// Top-level configuration, built once at startup and shared by reference.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tag used in pull request bodies and chat messages.
    pub owner: String,
    /// Webhook server settings.
    pub server: ServerConfig,
    /// Analysis service settings.
    pub llm: LlmConfig,
    /// Log extraction settings.
    pub extraction: ExtractionConfig,
    /// Jenkins post-back and console fetch settings.
    pub jenkins: JenkinsConfig,
    /// GitHub pull request and job-log settings.
    pub github: GithubConfig,
    /// Slack notification settings.
    pub slack: SlackConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            owner: "ci-assistant".to_owned(),
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            extraction: ExtractionConfig::default(),
            jenkins: JenkinsConfig::default(),
            github: GithubConfig::default(),
            slack: SlackConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with precedence env vars > TOML file > defaults.
    ///
    /// `explicit` wins over `$CI_ASSISTANT_CONFIG`, which wins over
    /// `./ci-assistant.toml`. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env = |key: &str| std::env::var(key).ok();
        let path = config_path_with(explicit, env);
        let mut config = Self::load_from_file(&path)?;
        config.apply_overrides(env);
        Ok(config)
    }

    /// Load from a TOML file only, without env overrides.
    fn load_from_file(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("invalid config file {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config file {}: {e}",
                path.display()
            )),
        }
    }

    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or has mistyped fields.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Takes a resolver so callers can substitute the process environment.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("ASSISTANT_OWNER") {
            self.owner = v;
        }

        // Server.
        if let Some(v) = env("CI_ASSISTANT_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = env("CI_ASSISTANT_LOGS_DIR") {
            self.server.logs_dir = Some(PathBuf::from(v));
        }

        // LLM. Provider first, since the model variables are per provider.
        if let Some(v) = env("LLM_PROVIDER") {
            match v.to_lowercase().as_str() {
                "groq" => self.llm.provider = LlmProviderKind::Groq,
                "openai" => self.llm.provider = LlmProviderKind::Openai,
                _ => tracing::warn!(var = "LLM_PROVIDER", value = %v, "ignoring invalid env override"),
            }
        }
        match self.llm.provider {
            LlmProviderKind::Groq => {
                if let Some(v) = env("GROQ_MODEL") {
                    self.llm.model = Some(v);
                }
                if let Some(v) = env("GROQ_BASE_URL") {
                    self.llm.base_url = Some(v);
                }
            }
            LlmProviderKind::Openai => {
                if let Some(v) = env("OPENAI_MODEL") {
                    self.llm.model = Some(v);
                }
                if let Some(v) = env("OPENAI_BASE_URL") {
                    self.llm.base_url = Some(v);
                }
            }
        }

        // Extraction.
        if let Some(v) = env("CI_ASSISTANT_EXTRACTION_POLICY") {
            match v.as_str() {
                "blocks" => self.extraction.policy = PolicyKind::Blocks,
                "recent_marker" => self.extraction.policy = PolicyKind::RecentMarker,
                _ => tracing::warn!(
                    var = "CI_ASSISTANT_EXTRACTION_POLICY",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("CI_ASSISTANT_MAX_BLOCKS") {
            parse_override("CI_ASSISTANT_MAX_BLOCKS", &v, &mut self.extraction.max_blocks);
        }
        if let Some(v) = env("CI_ASSISTANT_MAX_INPUT_BYTES") {
            parse_override(
                "CI_ASSISTANT_MAX_INPUT_BYTES",
                &v,
                &mut self.extraction.max_input_bytes,
            );
        }

        // Collaborators.
        if let Some(v) = env("JENKINS_URL") {
            self.jenkins.url = Some(v);
        }
        if let Some(v) = env("JENKINS_USER") {
            self.jenkins.user = Some(v);
        }
        if let Some(v) = env("GITHUB_REPO") {
            self.github.repo = Some(v);
        }
        if let Some(v) = env("GITHUB_BASE_BRANCH") {
            self.github.base_branch = v;
        }
    }
}

/// Resolve the config file path from an explicit path or an env resolver.
pub fn config_path_with(
    explicit: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    if let Some(p) = env(CONFIG_PATH_ENV) {
        return PathBuf::from(p);
    }
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

fn parse_override<T: FromStr>(var: &str, value: &str, target: &mut T) {
    match value.parse() {
        Ok(parsed) => *target = parsed,
        Err(_) => tracing::warn!(var, value = %value, "ignoring invalid env override"),
    }
}

// ── Server ──────────────────────────────────────────────────────

/// Webhook server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,
    /// Largest accepted webhook body in bytes.
    pub max_body_bytes: usize,
    /// Directory for rotated JSON logs. Console-only logging when unset.
    pub logs_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_owned(),
            max_body_bytes: 2_097_152,
            logs_dir: None,
        }
    }
}

// ── LLM ─────────────────────────────────────────────────────────

/// Which OpenAI-compatible backend serves the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    /// Groq's OpenAI-compatible endpoint.
    #[default]
    Groq,
    /// OpenAI chat completions.
    Openai,
}

impl LlmProviderKind {
    /// Default model for the provider.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Groq => "llama3-8b-8192",
            Self::Openai => "gpt-4o-mini",
        }
    }

    /// Default API base URL for the provider.
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::Openai => "https://api.openai.com/v1",
        }
    }

    /// Credential key holding the provider's API key.
    pub fn api_key_var(self) -> &'static str {
        match self {
            Self::Groq => "GROQ_API_KEY",
            Self::Openai => "OPENAI_API_KEY",
        }
    }

    /// Short provider name used in model identifiers and logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::Openai => "openai",
        }
    }
}

/// Analysis service settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend provider.
    pub provider: LlmProviderKind,
    /// Model override; the provider default applies when unset.
    pub model: Option<String>,
    /// API base URL override.
    pub base_url: Option<String>,
    /// Completion token cap.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::default(),
            model: None,
            base_url: None,
            max_tokens: 800,
            temperature: 0.0,
            timeout_secs: 30,
        }
    }
}

impl LlmConfig {
    /// Effective model name.
    pub fn model_name(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Effective API base URL, without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
    }
}

// ── Extraction ──────────────────────────────────────────────────

/// Log extraction settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Which extraction policy the orchestrator uses.
    pub policy: PolicyKind,
    /// Block cap for the `blocks` policy.
    pub max_blocks: usize,
    /// Logs above this size are rejected with `InputTooLarge`.
    pub max_input_bytes: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            max_blocks: DEFAULT_MAX_BLOCKS,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
        }
    }
}

impl ExtractionConfig {
    /// Build the configured extractor.
    pub fn extractor(&self) -> Extractor {
        Extractor::new(
            ExtractionPolicy::from_kind(self.policy, self.max_blocks),
            self.max_input_bytes,
        )
    }
}

// ── Collaborators ───────────────────────────────────────────────

/// Jenkins settings. The API token lives in credentials.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JenkinsConfig {
    /// Base URL of the Jenkins instance credentials may be sent to.
    pub url: Option<String>,
    /// Jenkins user for basic auth.
    pub user: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for JenkinsConfig {
    fn default() -> Self {
        Self {
            url: None,
            user: None,
            timeout_secs: 6,
        }
    }
}

impl JenkinsConfig {
    /// Whether `target` shares scheme, host and port with the configured
    /// Jenkins URL. Always false when no URL is configured.
    pub fn is_own_origin(&self, target: &str) -> bool {
        let Some(base) = self.url.as_deref() else {
            return false;
        };
        match (url::Url::parse(base), url::Url::parse(target)) {
            (Ok(base), Ok(target)) => base.origin() == target.origin(),
            _ => false,
        }
    }
}

/// GitHub settings. The token lives in credentials.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// Target repository as `owner/name` for suggested-pipeline PRs.
    pub repo: Option<String>,
    /// Branch the PRs are opened against.
    pub base_branch: String,
    /// Repository path the suggested pipeline is written to.
    pub patch_path: String,
    /// REST API base URL.
    pub api_base: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            repo: None,
            base_branch: "main".to_owned(),
            patch_path: ".github/workflows/ai-suggested.yml".to_owned(),
            api_base: "https://api.github.com".to_owned(),
            timeout_secs: 8,
        }
    }
}

/// Slack settings. The webhook URL lives in credentials.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self { timeout_secs: 4 }
    }
}
