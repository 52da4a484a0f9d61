//! Most-recent-failure extraction.
//!
//! Looks only at the end of the log and returns everything from the last
//! failure marker onward. Cheaper and more focused than block extraction
//! when only the final failure matters.

use super::last_chars;

/// Characters of log tail considered by the marker search.
pub const RECENT_WINDOW_CHARS: usize = 16_000;

/// Characters returned when no marker is present.
pub const RECENT_FALLBACK_CHARS: usize = 2_000;

/// Markers in priority order. The first one present in the window wins.
pub const RECENT_MARKERS: [&str; 5] = ["Traceback", "Exception", "ERROR", "error:", "fatal:"];

/// Return the most recent failure excerpt from `log`.
///
/// The final 16 000 characters are searched for the last occurrence of each
/// marker in [`RECENT_MARKERS`] order; the excerpt runs from that marker to
/// the end of the window. Without a marker, the final 2 000 characters are
/// returned. An empty log yields an empty string.
pub fn extract_recent_failure(log: &str) -> String {
    if log.is_empty() {
        return String::new();
    }

    let window = last_chars(log, RECENT_WINDOW_CHARS);
    RECENT_MARKERS
        .iter()
        .find_map(|marker| window.rfind(marker))
        .map_or_else(
            || last_chars(window, RECENT_FALLBACK_CHARS),
            |idx| &window[idx..],
        )
        .to_owned()
}
