//! Summary rendering.

use ci_assistant::extract::make_summary;
use ci_assistant::extract::summary::SUMMARY_BLOCK_CHARS;

#[test]
fn empty_blocks_render_empty() {
    let blocks: [&str; 0] = [];
    assert_eq!(make_summary(&blocks), "");
}

#[test]
fn single_block_format() {
    assert_eq!(
        make_summary(&["x"]),
        "--- Error block 1 (first 2000 chars) ---\n\nx"
    );
}

#[test]
fn blocks_are_numbered_from_one() {
    let summary = make_summary(&["a".to_owned(), "b".to_owned()]);
    assert_eq!(
        summary,
        "--- Error block 1 (first 2000 chars) ---\n\na\n\n\
         --- Error block 2 (first 2000 chars) ---\n\nb"
    );
}

#[test]
fn long_blocks_are_truncated_to_exactly_the_cap() {
    let block = "z".repeat(SUMMARY_BLOCK_CHARS.saturating_add(500));
    let summary = make_summary(&[block]);
    let body = summary
        .split("\n\n")
        .nth(1)
        .unwrap_or_default();
    assert_eq!(body.chars().count(), SUMMARY_BLOCK_CHARS);
}
