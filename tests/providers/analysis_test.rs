//! Prompt construction, JSON recovery, and the analyzer over a fake provider.

use ci_assistant::analysis::{build_prompt, extract_json, Analyzer, RepoFiles};
use ci_assistant::config::LlmConfig;

use crate::scripted::ScriptedProvider;

#[test]
fn prompt_lists_required_keys_and_summary() {
    let prompt = build_prompt("ERROR: npm ci failed", None);
    assert!(prompt.starts_with("You are a senior DevOps engineer."));
    assert!(prompt.contains(
        "Return strict JSON with keys: diagnosis, root_cause, fixes (array), pipeline_patch (string), confidence (float)."
    ));
    assert!(prompt.contains("Build logs:\nERROR: npm ci failed\n"));
    assert!(prompt.ends_with("Repository files:\nnone\n"));
}

#[test]
fn prompt_joins_manifest_names() {
    let mut files = RepoFiles::new();
    files.insert("package.json".to_owned(), "{}".to_owned());
    files.insert("Dockerfile".to_owned(), "FROM node".to_owned());
    let prompt = build_prompt("log", Some(&files));
    assert!(prompt.ends_with("Repository files:\nDockerfile, package.json\n"));
}

#[test]
fn empty_manifest_counts_as_none() {
    let prompt = build_prompt("log", Some(&RepoFiles::new()));
    assert!(prompt.ends_with("Repository files:\nnone\n"));
}

#[test]
fn extracts_from_json_fence() {
    let text = "Here you go:\n```json\n{\"diagnosis\": \"missing dep\"}\n```\nGood luck";
    let object = extract_json(text);
    assert_eq!(
        object.and_then(|o| o.get("diagnosis").cloned()),
        Some(serde_json::json!("missing dep"))
    );
}

#[test]
fn extracts_from_bare_fence_case_insensitively() {
    let text = "```JSON\n{\"confidence\": 0.4}\n```";
    assert!(extract_json(text).is_some_and(|o| o.contains_key("confidence")));
    let text = "```\n{\"fixes\": []}\n```";
    assert!(extract_json(text).is_some_and(|o| o.contains_key("fixes")));
}

#[test]
fn broken_fence_falls_through_to_embedded_object() {
    let text = "```json\nnot json\n``` but later {\"diagnosis\": \"ok\"}";
    assert!(extract_json(text).is_some_and(|o| o.contains_key("diagnosis")));
}

#[test]
fn extracts_embedded_object_from_prose() {
    let text = "The answer is {\"diagnosis\": \"flaky test\", \"fixes\": [\"retry\"]} as requested.";
    let object = extract_json(text);
    assert!(object.is_some_and(|o| o.len() == 2));
}

#[test]
fn balanced_scan_recovers_first_object_when_greedy_span_fails() {
    let text = "{\"diagnosis\": \"a\"} and also {\"other\": 1}";
    let object = extract_json(text);
    assert_eq!(
        object.and_then(|o| o.get("diagnosis").cloned()),
        Some(serde_json::json!("a"))
    );
}

#[test]
fn text_without_object_yields_none() {
    assert!(extract_json("no braces here").is_none());
    assert!(extract_json("} backwards {").is_none());
    assert!(extract_json("[1, 2, 3]").is_none());
}

#[tokio::test]
async fn analyze_parses_structured_reply() {
    let provider = ScriptedProvider::replying(
        "```json\n{\"diagnosis\": \"node version mismatch\", \"root_cause\": \"engines field\", \
         \"fixes\": [\"use node 20\"], \"pipeline_patch\": \"name: ci\", \"confidence\": 0.8}\n```",
    );
    let analyzer = Analyzer::new(provider.clone(), &LlmConfig::default());

    let analysis = match analyzer.analyze("ERROR: engine mismatch", None).await {
        Ok(analysis) => analysis,
        Err(err) => panic!("analysis should succeed: {err}"),
    };
    assert_eq!(analysis.diagnosis.as_deref(), Some("node version mismatch"));
    assert_eq!(analysis.root_cause.as_deref(), Some("engines field"));
    assert_eq!(analysis.fixes, vec!["use node 20".to_owned()]);
    assert_eq!(analysis.patch(), Some("name: ci"));
    assert_eq!(analysis.confidence, Some(0.8));
    assert_eq!(analysis.raw, None);

    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("ERROR: engine mismatch"));
}

#[tokio::test]
async fn analyze_keeps_raw_text_when_no_json() {
    let provider = ScriptedProvider::replying("I think the build is broken.");
    let analyzer = Analyzer::new(provider, &LlmConfig::default());

    let analysis = match analyzer.analyze("log", None).await {
        Ok(analysis) => analysis,
        Err(err) => panic!("analysis should succeed: {err}"),
    };
    assert!(analysis.is_raw_only());
    assert_eq!(analysis.raw.as_deref(), Some("I think the build is broken."));
    assert_eq!(analysis.diagnosis, None);
}

#[tokio::test]
async fn pipeline_key_counts_as_patch() {
    let provider = ScriptedProvider::replying("{\"pipeline\": \"pipeline { }\"}");
    let analyzer = Analyzer::new(provider, &LlmConfig::default());
    let analysis = match analyzer.analyze("log", None).await {
        Ok(analysis) => analysis,
        Err(err) => panic!("analysis should succeed: {err}"),
    };
    assert_eq!(analysis.patch(), Some("pipeline { }"));
}

#[tokio::test]
async fn provider_failure_is_an_error() {
    let analyzer = Analyzer::new(ScriptedProvider::failing("down"), &LlmConfig::default());
    assert!(analyzer.analyze("log", None).await.is_err());
}
