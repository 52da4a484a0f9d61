//! Failure analysis through the configured LLM provider.
//!
//! The model is asked for strict JSON, but chat models routinely wrap it in
//! prose or code fences. [`extract_json`] recovers the object; when nothing
//! parses the text is kept verbatim in [`Analysis::raw`].

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::providers::{CompletionRequest, LlmProvider, Message, ProviderError};

/// Repository manifest: relative path to (truncated) file contents.
pub type RepoFiles = BTreeMap<String, String>;

/// Errors from [`Analyzer::analyze`].
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The provider call failed.
    #[error("analysis request failed: {0}")]
    Provider(#[from] ProviderError),
}

/// Structured diagnosis returned by the model.
///
/// Every field is optional because the model is free to omit any of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// One-sentence diagnosis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    /// Root cause hypothesis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<String>,
    /// Ordered fix steps.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixes: Vec<String>,
    /// Suggested Jenkinsfile or workflow YAML.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_patch: Option<String>,
    /// Model confidence in `0..=1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Unparsed model text, set when no JSON object could be recovered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    /// Any other keys the model returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Analysis {
    /// Build an analysis from a recovered JSON object.
    ///
    /// Lenient about value types: non-string fix items are stringified and a
    /// numeric string is accepted as confidence.
    pub fn from_object(mut object: Map<String, Value>) -> Self {
        let diagnosis = object.remove("diagnosis").and_then(text_value);
        let root_cause = object.remove("root_cause").and_then(text_value);
        let pipeline_patch = object.remove("pipeline_patch").and_then(text_value);
        let raw = object.remove("raw").and_then(text_value);
        let confidence = object.remove("confidence").and_then(|value| match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });
        let fixes = match object.remove("fixes") {
            Some(Value::Array(items)) => items.into_iter().filter_map(text_value).collect(),
            Some(other) => text_value(other).into_iter().collect(),
            None => Vec::new(),
        };

        Self {
            diagnosis,
            root_cause,
            fixes,
            pipeline_patch,
            confidence,
            raw,
            extra: object,
        }
    }

    /// Analysis wrapping unparsed model text.
    pub fn from_raw(text: impl Into<String>) -> Self {
        Self {
            raw: Some(text.into()),
            ..Self::default()
        }
    }

    /// Suggested pipeline, from `pipeline_patch` or a `pipeline` key.
    pub fn patch(&self) -> Option<&str> {
        self.pipeline_patch
            .as_deref()
            .or_else(|| self.extra.get("pipeline").and_then(Value::as_str))
            .filter(|patch| !patch.trim().is_empty())
    }

    /// Whether the model returned no structured fields at all.
    pub fn is_raw_only(&self) -> bool {
        self.diagnosis.is_none()
            && self.fixes.is_empty()
            && self.pipeline_patch.is_none()
            && self.raw.is_some()
    }
}

fn text_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Build the analysis prompt for a log summary and optional manifest.
pub fn build_prompt(summary: &str, repo_files: Option<&RepoFiles>) -> String {
    let repo_hint = match repo_files {
        Some(files) if !files.is_empty() => files.keys().cloned().collect::<Vec<_>>().join(", "),
        _ => "none".to_owned(),
    };

    format!(
        "You are a senior DevOps engineer. Analyze the following failing CI build logs and give:\n\
         1) Short diagnosis (one sentence)\n\
         2) Root cause hypothesis\n\
         3) Step-by-step fixes (array)\n\
         4) A suggested pipeline patch (Jenkinsfile or GitHub Actions YAML)\n\
         5) Confidence score 0-1\n\
         \n\
         Return strict JSON with keys: diagnosis, root_cause, fixes (array), pipeline_patch (string), confidence (float).\n\
         \n\
         Build logs:\n\
         {summary}\n\
         \n\
         Repository files:\n\
         {repo_hint}\n"
    )
}

static FENCED_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)```(?:json)?\s*([\s\S]+?)\s*```").ok());

/// Recover a JSON object from free-form model output.
///
/// Tries, in order: the first fenced code block, the span from the first
/// `{` to the last `}`, and a brace-balanced scan from the first `{`.
pub fn extract_json(text: &str) -> Option<Map<String, Value>> {
    if let Some(body) = FENCED_BLOCK
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
    {
        if let Some(object) = parse_object(body.as_str().trim()) {
            return Some(object);
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    if let Some(object) = text.get(start..=end).and_then(parse_object) {
        return Some(object);
    }

    balanced_object(text, start).and_then(parse_object)
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// The substring from `start` up to the brace that closes it.
fn balanced_object(text: &str, start: usize) -> Option<&str> {
    let tail = text.get(start..)?;
    let mut depth: usize = 0;
    for (offset, ch) in tail.char_indices() {
        match ch {
            '{' => depth = depth.saturating_add(1),
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return tail.get(..=offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Sends summaries to the LLM and parses the diagnosis.
#[derive(Clone)]
pub struct Analyzer {
    provider: Arc<dyn LlmProvider>,
    max_tokens: u32,
    temperature: f32,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("model", &self.provider.model_id())
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Analyzer {
    /// Create an analyzer over a provider using the `[llm]` settings.
    pub fn new(provider: Arc<dyn LlmProvider>, config: &LlmConfig) -> Self {
        Self {
            provider,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// Model identifier of the underlying provider.
    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    /// Ask the model to diagnose `summary`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Provider`] when the completion call fails.
    /// Unparseable model output is not an error.
    pub async fn analyze(
        &self,
        summary: &str,
        repo_files: Option<&RepoFiles>,
    ) -> Result<Analysis, AnalysisError> {
        let request = CompletionRequest {
            messages: vec![Message::user(build_prompt(summary, repo_files))],
            system: None,
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
        };

        let response = self.provider.complete(request).await?;
        debug!(
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "analysis completion received"
        );

        match extract_json(&response.text) {
            Some(object) => Ok(Analysis::from_object(object)),
            None => {
                warn!(
                    chars = response.text.chars().count(),
                    "model output had no JSON object, keeping raw text"
                );
                Ok(Analysis::from_raw(response.text))
            }
        }
    }
}
