//! Webhook payload normalization.
//!
//! Jenkins notifications carry a `build` object, GitHub Actions deliveries a
//! `workflow_run` object, and anything else is kept as opaque text. All three
//! shapes collapse into one [`CanonicalEvent`] so the rest of the pipeline
//! never inspects raw payloads.
//!
//! [`normalize`] is total: missing or mistyped fields degrade to `None` or an
//! empty string instead of failing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// CI system that produced a webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    /// Jenkins build notification (payload has a `build` key).
    Jenkins,
    /// GitHub Actions `workflow_run` delivery.
    Github,
    /// Anything else.
    Unknown,
}

impl std::fmt::Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Jenkins => write!(f, "jenkins"),
            Self::Github => write!(f, "github"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Source-agnostic view of a CI webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    /// Which CI system sent the payload.
    pub source: EventSource,
    /// Build status (Jenkins) or delivery action (GitHub).
    pub status: Option<String>,
    /// Dereferenceable build or run URL.
    pub url: Option<String>,
    /// Raw log text; empty when the payload carried none.
    pub logs: String,
    /// The original payload, untouched.
    pub metadata: Value,
}

impl CanonicalEvent {
    /// Whether the event already carries log text.
    pub fn has_logs(&self) -> bool {
        !self.logs.is_empty()
    }
}

/// Normalize an arbitrary webhook payload into a [`CanonicalEvent`].
pub fn normalize(payload: &Value) -> CanonicalEvent {
    let Some(map) = payload.as_object() else {
        return CanonicalEvent {
            source: EventSource::Unknown,
            status: None,
            url: None,
            logs: stringify(payload),
            metadata: payload.clone(),
        };
    };

    if let Some(build) = map.get("build") {
        let full_url = string_field(build, "full_url").filter(|u| !u.is_empty());
        return CanonicalEvent {
            source: EventSource::Jenkins,
            status: string_field(build, "status"),
            url: full_url.or_else(|| string_field(build, "url")),
            logs: string_field(build, "logs").unwrap_or_default(),
            metadata: payload.clone(),
        };
    }

    if let Some(run) = map.get("workflow_run") {
        // Workflow deliveries never embed logs; the fetcher pulls them later.
        return CanonicalEvent {
            source: EventSource::Github,
            status: string_field(payload, "action"),
            url: string_field(run, "html_url"),
            logs: String::new(),
            metadata: payload.clone(),
        };
    }

    CanonicalEvent {
        source: EventSource::Unknown,
        status: None,
        url: None,
        logs: payload.to_string(),
        metadata: payload.clone(),
    }
}

/// Read a string field from a JSON object, ignoring non-string values.
fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// Text form of a non-object payload: strings verbatim, everything else as JSON.
fn stringify(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
