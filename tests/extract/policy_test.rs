//! Policy selection and the size-guarded extractor.

use ci_assistant::extract::{
    ExtractError, ExtractionPolicy, Extractor, PolicyKind, DEFAULT_MAX_INPUT_BYTES,
};

const LOG: &str = "setup\nERROR: first\n\nmore\nfatal: last\n";

#[test]
fn default_policy_is_recent_marker() {
    assert_eq!(ExtractionPolicy::default(), ExtractionPolicy::RecentMarker);
    assert_eq!(Extractor::default().policy(), ExtractionPolicy::RecentMarker);
}

#[test]
fn from_kind_carries_block_cap() {
    assert_eq!(
        ExtractionPolicy::from_kind(PolicyKind::Blocks, 3),
        ExtractionPolicy::Blocks { max_blocks: 3 }
    );
    assert_eq!(
        ExtractionPolicy::from_kind(PolicyKind::RecentMarker, 3),
        ExtractionPolicy::RecentMarker
    );
}

#[test]
fn blocks_policy_renders_summary() {
    let snippet = ExtractionPolicy::Blocks { max_blocks: 5 }.apply(LOG);
    assert_eq!(
        snippet,
        "--- Error block 1 (first 2000 chars) ---\n\nERROR: first"
    );
}

#[test]
fn recent_policy_returns_tail_from_marker() {
    // "ERROR" outranks "fatal:" so the excerpt starts at the ERROR line.
    let snippet = ExtractionPolicy::RecentMarker.apply(LOG);
    assert_eq!(snippet, "ERROR: first\n\nmore\nfatal: last\n");
}

#[test]
fn oversized_input_is_rejected() {
    let extractor = Extractor::new(ExtractionPolicy::RecentMarker, 16);
    let log = "a".repeat(17);
    assert_eq!(
        extractor.extract(&log),
        Err(ExtractError::InputTooLarge {
            size: 17,
            limit: 16
        })
    );
}

#[test]
fn input_at_the_limit_is_accepted() {
    let extractor = Extractor::new(ExtractionPolicy::RecentMarker, 16);
    let log = "a".repeat(16);
    assert!(extractor.extract(&log).is_ok());
}

#[test]
fn default_limit_is_eight_mebibytes() {
    assert_eq!(DEFAULT_MAX_INPUT_BYTES, 8_388_608);
}

#[test]
fn policy_kind_parses_snake_case() {
    let kind: Result<PolicyKind, _> = serde_json::from_str("\"recent_marker\"");
    assert!(matches!(kind, Ok(PolicyKind::RecentMarker)));
    let kind: Result<PolicyKind, _> = serde_json::from_str("\"blocks\"");
    assert!(matches!(kind, Ok(PolicyKind::Blocks)));
}
