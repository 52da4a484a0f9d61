//! Coverage for credential loading and lookup.

use std::collections::BTreeMap;
use std::fs;

use ci_assistant::credentials::{
    load_credentials, load_runtime_credentials, Credentials, GITHUB_TOKEN, GROQ_API_KEY,
    SLACK_WEBHOOK,
};

#[test]
fn loads_known_keys_only() {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(err) => panic!("tempdir: {err}"),
    };
    let env_path = dir.path().join(".env");
    let write = fs::write(
        &env_path,
        "GROQ_API_KEY=gsk_test\nUNRELATED=value\nSLACK_WEBHOOK=https://hooks.example/x\n",
    );
    assert!(write.is_ok());

    let credentials = match load_credentials(&env_path) {
        Ok(credentials) => credentials,
        Err(err) => panic!("credentials should load: {err}"),
    };
    assert_eq!(credentials.get(GROQ_API_KEY), Some("gsk_test"));
    assert_eq!(credentials.get(SLACK_WEBHOOK), Some("https://hooks.example/x"));
    assert_eq!(credentials.get("UNRELATED"), None);
}

#[test]
fn missing_file_is_an_error_for_explicit_load() {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(err) => panic!("tempdir: {err}"),
    };
    assert!(load_credentials(&dir.path().join(".env")).is_err());
}

#[test]
fn missing_file_is_fine_for_runtime_load() {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(err) => panic!("tempdir: {err}"),
    };
    assert!(load_runtime_credentials(&dir.path().join(".env")).is_ok());
}

#[test]
fn blank_values_count_as_missing() {
    let mut vars = BTreeMap::new();
    vars.insert(GITHUB_TOKEN.to_owned(), "   ".to_owned());
    let credentials = Credentials::from_map(vars);
    assert_eq!(credentials.get(GITHUB_TOKEN), None);
    assert!(credentials.known_secrets().is_empty());
}

#[test]
fn overlay_replaces_file_values() {
    let mut vars = BTreeMap::new();
    vars.insert(GROQ_API_KEY.to_owned(), "from-file".to_owned());
    let mut credentials = Credentials::from_map(vars);
    credentials.overlay(|key| (key == GROQ_API_KEY).then(|| "from-env".to_owned()));
    assert_eq!(credentials.get(GROQ_API_KEY), Some("from-env"));
}

#[test]
fn debug_never_prints_values() {
    let mut vars = BTreeMap::new();
    vars.insert(GITHUB_TOKEN.to_owned(), "ghp_supersecret".to_owned());
    let rendered = format!("{:?}", Credentials::from_map(vars));
    assert!(rendered.contains(GITHUB_TOKEN));
    assert!(!rendered.contains("ghp_supersecret"));
}
