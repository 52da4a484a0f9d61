//! Credential loading from a `.env` file and the process environment.
//!
//! Only the keys in [`KNOWN_KEYS`] are read. File values are overlaid by
//! environment variables of the same name.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, warn};

/// LLM key for the OpenAI backend.
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// LLM key for the Groq backend.
pub const GROQ_API_KEY: &str = "GROQ_API_KEY";
/// Token for GitHub REST calls.
pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
/// Jenkins API token paired with `jenkins.user`.
pub const JENKINS_API_TOKEN: &str = "JENKINS_API_TOKEN";
/// Slack incoming-webhook URL.
pub const SLACK_WEBHOOK: &str = "SLACK_WEBHOOK";

/// Every credential key the assistant reads.
pub const KNOWN_KEYS: [&str; 5] = [
    OPENAI_API_KEY,
    GROQ_API_KEY,
    GITHUB_TOKEN,
    JENKINS_API_TOKEN,
    SLACK_WEBHOOK,
];

/// Runtime secrets.
#[derive(Clone, Default)]
pub struct Credentials {
    vars: BTreeMap<String, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("keys", &self.vars.keys().collect::<Vec<_>>())
            .field("values", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from a key-value map.
    pub fn from_map(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }

    /// Returns a non-blank credential value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Returns all non-empty credential values for redaction purposes.
    pub fn known_secrets(&self) -> Vec<String> {
        self.vars
            .values()
            .filter(|value| !value.trim().is_empty())
            .cloned()
            .collect()
    }

    /// Overlay values from a resolver (normally the process environment).
    pub fn overlay(&mut self, env: impl Fn(&str) -> Option<String>) {
        for key in KNOWN_KEYS {
            if let Some(value) = env(key) {
                self.vars.insert(key.to_owned(), value);
            }
        }
    }
}

/// Load credentials from a specific `.env` path.
///
/// Only [`KNOWN_KEYS`] are kept.
///
/// # Errors
///
/// Returns an error if the file does not exist or parsing fails.
pub fn load_credentials(path: &Path) -> anyhow::Result<Credentials> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "credentials file does not exist: {}",
            path.display()
        ));
    }

    warn_if_shared(path);

    let mut vars = BTreeMap::new();
    let iter = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to read credentials at {}", path.display()))?;

    for item in iter {
        let (key, value) = item.with_context(|| {
            format!(
                "failed to parse key-value entry in credentials file {}",
                path.display()
            )
        })?;
        if KNOWN_KEYS.contains(&key.as_str()) {
            vars.insert(key, value);
        }
    }

    Ok(Credentials { vars })
}

/// Load credentials from an optional `.env` file, then overlay the process
/// environment.
///
/// A missing file is not an error; the environment alone is used.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be parsed.
pub fn load_runtime_credentials(env_file: &Path) -> anyhow::Result<Credentials> {
    let mut credentials = if env_file.exists() {
        load_credentials(env_file)?
    } else {
        debug!(path = %env_file.display(), "no .env file, using process environment only");
        Credentials::default()
    };
    credentials.overlay(|key| std::env::var(key).ok());
    Ok(credentials)
}

#[cfg(unix)]
fn warn_if_shared(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let Ok(metadata) = fs::metadata(path) else {
        return;
    };
    let mode = metadata.permissions().mode() & 0o777;
    if mode & 0o077 != 0 {
        warn!(
            path = %path.display(),
            mode = format!("{mode:o}"),
            "credentials file is readable by other users; consider chmod 600"
        );
    }
}

#[cfg(not(unix))]
fn warn_if_shared(_path: &Path) {}
