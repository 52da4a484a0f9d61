//! Log snippet extraction.
//!
//! CI logs routinely run to tens of thousands of lines, nearly all of it
//! build-tool chatter, while the analysis service accepts only a small
//! prompt. This module reduces a raw log to a bounded, high-signal snippet
//! using one of two policies:
//!
//! - [`ExtractionPolicy::Blocks`]: every distinct failure signature, capped
//!   in count, rendered with [`summary::make_summary`].
//! - [`ExtractionPolicy::RecentMarker`]: only the most recent failure,
//!   found by a backward marker search.
//!
//! Everything here is pure and synchronous. The only error is
//! [`ExtractError::InputTooLarge`]; a log without recognizable markers is a
//! normal case handled by each policy's fallback.

use serde::{Deserialize, Serialize};

pub mod blocks;
pub mod recent;
pub mod summary;

pub use blocks::{extract_error_blocks, DEFAULT_MAX_BLOCKS};
pub use recent::extract_recent_failure;
pub use summary::make_summary;

/// Default upper bound on the size of a log accepted by [`Extractor`].
pub const DEFAULT_MAX_INPUT_BYTES: usize = 8_388_608;

/// Errors raised by [`Extractor::extract`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// The log exceeds the configured size limit.
    #[error("log is {size} bytes, above the {limit} byte extraction limit")]
    InputTooLarge {
        /// Size of the rejected log in bytes.
        size: usize,
        /// Configured limit in bytes.
        limit: usize,
    },
}

/// Configuration-level name of an extraction policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Multi-pattern block extraction followed by the summary builder.
    Blocks,
    /// Single most-recent-marker extraction.
    #[default]
    RecentMarker,
}

/// How a raw log is reduced to the snippet sent for analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionPolicy {
    /// All distinct failures, at most `max_blocks` of them.
    Blocks {
        /// Cap on the number of extracted blocks.
        max_blocks: usize,
    },
    /// Most recent failure wins.
    RecentMarker,
}

impl ExtractionPolicy {
    /// Build a policy from its configuration name.
    pub fn from_kind(kind: PolicyKind, max_blocks: usize) -> Self {
        match kind {
            PolicyKind::Blocks => Self::Blocks { max_blocks },
            PolicyKind::RecentMarker => Self::RecentMarker,
        }
    }

    /// Apply the policy to a log without any size check.
    pub fn apply(self, log: &str) -> String {
        match self {
            Self::Blocks { max_blocks } => make_summary(&extract_error_blocks(log, max_blocks)),
            Self::RecentMarker => extract_recent_failure(log),
        }
    }
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        Self::RecentMarker
    }
}

/// Size-guarded entry point used by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extractor {
    policy: ExtractionPolicy,
    max_input_bytes: usize,
}

impl Extractor {
    /// Create an extractor for a policy and an input size limit.
    pub fn new(policy: ExtractionPolicy, max_input_bytes: usize) -> Self {
        Self {
            policy,
            max_input_bytes,
        }
    }

    /// The configured policy.
    pub fn policy(&self) -> ExtractionPolicy {
        self.policy
    }

    /// Reduce `log` to a snippet.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InputTooLarge`] when `log` is longer than the
    /// configured limit.
    pub fn extract(&self, log: &str) -> Result<String, ExtractError> {
        if log.len() > self.max_input_bytes {
            return Err(ExtractError::InputTooLarge {
                size: log.len(),
                limit: self.max_input_bytes,
            });
        }
        Ok(self.policy.apply(log))
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(ExtractionPolicy::default(), DEFAULT_MAX_INPUT_BYTES)
    }
}

/// The first `n` characters of `text`.
pub(crate) fn first_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// The last `n` characters of `text`.
pub(crate) fn last_chars(text: &str, n: usize) -> &str {
    let Some(back) = n.checked_sub(1) else {
        return "";
    };
    match text.char_indices().rev().nth(back) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}
