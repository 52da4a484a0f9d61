//! Summary rendering for extracted error blocks.

use super::first_chars;

/// Characters of each block kept in the summary.
pub const SUMMARY_BLOCK_CHARS: usize = 2_000;

/// Render blocks as numbered sections separated by blank lines.
///
/// Each block becomes a `--- Error block {n} (first 2000 chars) ---` header
/// followed by the block's first 2000 characters. An empty slice renders as
/// an empty string.
pub fn make_summary<S: AsRef<str>>(blocks: &[S]) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(blocks.len().saturating_mul(2));
    for (index, block) in blocks.iter().enumerate() {
        parts.push(format!(
            "--- Error block {} (first {SUMMARY_BLOCK_CHARS} chars) ---",
            index.saturating_add(1)
        ));
        parts.push(first_chars(block.as_ref(), SUMMARY_BLOCK_CHARS).to_owned());
    }
    parts.join("\n\n")
}
