//! Multi-pattern error block extraction.
//!
//! Pattern classes are tried in priority order. Each class contributes all
//! of its non-overlapping matches before the next class is consulted, and
//! collection stops the moment the block cap is reached.

use std::ops::ControlFlow;
use std::sync::LazyLock;

use regex::Regex;

/// Block cap used when the caller has no preference.
pub const DEFAULT_MAX_BLOCKS: usize = 5;

/// Number of trailing lines returned when nothing matches.
pub const FALLBACK_TAIL_LINES: usize = 500;

/// A named failure-signature shape.
struct PatternClass {
    name: &'static str,
    regex: Regex,
}

/// Pattern classes in priority order. Capture group 1 is the block.
static PATTERN_CLASSES: LazyLock<Vec<PatternClass>> = LazyLock::new(|| {
    [
        (
            "traceback",
            r"(?s)(Traceback \(most recent call last\):.+?)(?:\n\n|\z)",
        ),
        ("error_label", r"(?ms)^(ERROR:.*?)(?:\n\n|\z)"),
        ("exception_label", r"(?s)(Exception:.*?)(?:\n\n|\z)"),
    ]
    .into_iter()
    .filter_map(|(name, pattern)| {
        Regex::new(pattern)
            .ok()
            .map(|regex| PatternClass { name, regex })
    })
    .collect()
});

/// Accumulates blocks up to a fixed capacity.
struct BlockCollector {
    blocks: Vec<String>,
    capacity: usize,
}

impl BlockCollector {
    fn new(capacity: usize) -> Self {
        Self {
            blocks: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a block, breaking once the collector is full.
    fn push(&mut self, block: &str) -> ControlFlow<()> {
        self.blocks.push(block.to_owned());
        if self.blocks.len() >= self.capacity {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    /// Feed every match of one pattern class.
    fn collect_class(&mut self, class: &PatternClass, log: &str) -> ControlFlow<()> {
        for caps in class.regex.captures_iter(log) {
            if let Some(block) = caps.get(1) {
                tracing::trace!(class = class.name, start = block.start(), "error block matched");
                self.push(block.as_str().trim())?;
            }
        }
        ControlFlow::Continue(())
    }
}

/// Extract up to `max_blocks` likely-relevant error excerpts from `log`.
///
/// Blocks are returned in pattern-priority order: all trace blocks first,
/// then `ERROR:` blocks, then `Exception:` blocks. When no pattern matches,
/// the result is a single block holding the last 500 lines of the log, so
/// the result is never empty. A `max_blocks` of zero is treated as one.
pub fn extract_error_blocks(log: &str, max_blocks: usize) -> Vec<String> {
    let mut collector = BlockCollector::new(max_blocks.max(1));

    let full = PATTERN_CLASSES
        .iter()
        .try_for_each(|class| collector.collect_class(class, log));
    if full.is_break() || !collector.blocks.is_empty() {
        return collector.blocks;
    }

    vec![tail_lines(log, FALLBACK_TAIL_LINES)]
}

/// The last `n` lines of `text`, joined with `\n`.
fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
