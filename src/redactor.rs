//! Secret scrubbing for text that leaves the process.
//!
//! Build logs frequently echo tokens. Every snippet is passed through the
//! [`Redactor`] before it reaches the analysis service.

use regex::Regex;

/// Replacement marker for redacted content.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Token shapes that are redacted even when not among the known secrets.
const TOKEN_PATTERNS: [&str; 8] = [
    r"sk-ant-[A-Za-z0-9_\-]{10,}",
    r"sk-[A-Za-z0-9_\-]{32,}",
    r"gsk_[A-Za-z0-9]{20,}",
    r"ghp_[A-Za-z0-9]{20,}",
    r"github_pat_[A-Za-z0-9_]{20,}",
    r"glpat-[A-Za-z0-9_\-]{16,}",
    r"xox[bp]-[A-Za-z0-9\-]{20,}",
    r"https://hooks\.slack\.com/services/[A-Za-z0-9/]+",
];

/// Redacts known secret values and token-like patterns.
#[derive(Debug, Clone)]
pub struct Redactor {
    exact_secrets: Vec<String>,
    patterns: Vec<Regex>,
}

impl Redactor {
    /// Create a redactor from known secret values.
    pub fn new(exact_secrets: Vec<String>) -> Self {
        Self {
            exact_secrets,
            patterns: default_patterns(),
        }
    }

    /// Replace known secrets and token patterns with [`REDACTION_MARKER`].
    pub fn redact(&self, text: &str) -> String {
        let mut sanitized = text.to_owned();
        for secret in &self.exact_secrets {
            if !secret.is_empty() {
                sanitized = sanitized.replace(secret, REDACTION_MARKER);
            }
        }
        for pattern in &self.patterns {
            sanitized = pattern
                .replace_all(&sanitized, REDACTION_MARKER)
                .into_owned();
        }
        sanitized
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

fn default_patterns() -> Vec<Regex> {
    TOKEN_PATTERNS
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
}
