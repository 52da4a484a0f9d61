//! Coverage for config parsing, defaults, and env overrides.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ci_assistant::config::{config_path_with, Config, LlmProviderKind, DEFAULT_CONFIG_FILE};
use ci_assistant::extract::{ExtractionPolicy, PolicyKind};

fn resolver(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn empty_toml_yields_defaults() {
    let config = match Config::from_toml("") {
        Ok(config) => config,
        Err(err) => panic!("empty config should parse: {err}"),
    };
    assert_eq!(config.owner, "ci-assistant");
    assert_eq!(config.server.bind, "0.0.0.0:8000");
    assert_eq!(config.server.max_body_bytes, 2_097_152);
    assert_eq!(config.llm.provider, LlmProviderKind::Groq);
    assert_eq!(config.llm.model_name(), "llama3-8b-8192");
    assert_eq!(config.llm.api_base(), "https://api.groq.com/openai/v1");
    assert_eq!(config.llm.max_tokens, 800);
    assert_eq!(config.llm.timeout_secs, 30);
    assert_eq!(config.extraction.policy, PolicyKind::RecentMarker);
    assert_eq!(config.extraction.max_blocks, 5);
    assert_eq!(config.github.base_branch, "main");
    assert_eq!(config.github.patch_path, ".github/workflows/ai-suggested.yml");
    assert_eq!(config.jenkins.timeout_secs, 6);
    assert_eq!(config.slack.timeout_secs, 4);
}

#[test]
fn parses_sections() {
    let toml_str = r#"
owner = "build-bot"

[server]
bind = "127.0.0.1:9000"
logs_dir = "/var/log/ci"

[llm]
provider = "openai"
base_url = "http://localhost:8080/v1/"

[extraction]
policy = "blocks"
max_blocks = 3

[github]
repo = "acme/widgets"
"#;
    let config = match Config::from_toml(toml_str) {
        Ok(config) => config,
        Err(err) => panic!("config should parse: {err}"),
    };
    assert_eq!(config.owner, "build-bot");
    assert_eq!(config.server.bind, "127.0.0.1:9000");
    assert_eq!(config.server.logs_dir, Some(PathBuf::from("/var/log/ci")));
    assert_eq!(config.llm.provider, LlmProviderKind::Openai);
    assert_eq!(config.llm.model_name(), "gpt-4o-mini");
    assert_eq!(config.llm.api_base(), "http://localhost:8080/v1");
    assert_eq!(
        config.extraction.extractor().policy(),
        ExtractionPolicy::Blocks { max_blocks: 3 }
    );
    assert_eq!(config.github.repo.as_deref(), Some("acme/widgets"));
}

#[test]
fn unknown_provider_is_a_parse_error() {
    assert!(Config::from_toml("[llm]\nprovider = \"mystery\"\n").is_err());
}

#[test]
fn env_overrides_apply() {
    let mut config = Config::default();
    config.apply_overrides(resolver(&[
        ("LLM_PROVIDER", "OpenAI"),
        ("OPENAI_MODEL", "gpt-4.1"),
        ("GROQ_MODEL", "ignored-for-openai"),
        ("GITHUB_REPO", "o/r"),
        ("GITHUB_BASE_BRANCH", "develop"),
        ("JENKINS_USER", "jenkins"),
        ("JENKINS_URL", "https://ci.example.com/"),
        ("ASSISTANT_OWNER", "night-shift"),
        ("CI_ASSISTANT_EXTRACTION_POLICY", "blocks"),
        ("CI_ASSISTANT_MAX_BLOCKS", "2"),
    ]));
    assert_eq!(config.llm.provider, LlmProviderKind::Openai);
    assert_eq!(config.llm.model_name(), "gpt-4.1");
    assert_eq!(config.github.repo.as_deref(), Some("o/r"));
    assert_eq!(config.github.base_branch, "develop");
    assert_eq!(config.jenkins.user.as_deref(), Some("jenkins"));
    assert_eq!(config.jenkins.url.as_deref(), Some("https://ci.example.com/"));
    assert_eq!(config.owner, "night-shift");
    assert_eq!(config.extraction.policy, PolicyKind::Blocks);
    assert_eq!(config.extraction.max_blocks, 2);
}

#[test]
fn invalid_env_values_are_ignored() {
    let mut config = Config::default();
    config.apply_overrides(resolver(&[
        ("LLM_PROVIDER", "anthropic"),
        ("CI_ASSISTANT_MAX_BLOCKS", "many"),
        ("CI_ASSISTANT_EXTRACTION_POLICY", "newest"),
    ]));
    assert_eq!(config.llm.provider, LlmProviderKind::Groq);
    assert_eq!(config.extraction.max_blocks, 5);
    assert_eq!(config.extraction.policy, PolicyKind::RecentMarker);
}

#[test]
fn groq_env_model_and_base_url() {
    let mut config = Config::default();
    config.apply_overrides(resolver(&[
        ("GROQ_MODEL", "llama-3.1-70b"),
        ("GROQ_BASE_URL", "http://proxy/groq/"),
    ]));
    assert_eq!(config.llm.model_name(), "llama-3.1-70b");
    assert_eq!(config.llm.api_base(), "http://proxy/groq");
}

#[test]
fn config_path_precedence() {
    let explicit = Path::new("/etc/ci.toml");
    let env = resolver(&[("CI_ASSISTANT_CONFIG", "/srv/ci.toml")]);
    assert_eq!(config_path_with(Some(explicit), &env), explicit);
    assert_eq!(config_path_with(None, &env), PathBuf::from("/srv/ci.toml"));
    assert_eq!(
        config_path_with(None, resolver(&[])),
        PathBuf::from(DEFAULT_CONFIG_FILE)
    );
}

#[test]
fn load_reads_explicit_file() {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(err) => panic!("tempdir: {err}"),
    };
    let path = dir.path().join("ci.toml");
    assert!(std::fs::write(&path, "[slack]\ntimeout_secs = 9\n").is_ok());

    let config = match Config::load(Some(&path)) {
        Ok(config) => config,
        Err(err) => panic!("config should load: {err}"),
    };
    assert_eq!(config.slack.timeout_secs, 9);
}

#[test]
fn load_with_missing_file_uses_defaults() {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(err) => panic!("tempdir: {err}"),
    };
    let config = Config::load(Some(&dir.path().join("absent.toml")));
    assert!(config.is_ok());
}

#[test]
fn jenkins_origin_matches_scheme_host_and_port() {
    let mut config = Config::default();
    assert!(!config.jenkins.is_own_origin("https://ci.example.com/job/a/1/"));

    config.jenkins.url = Some("https://ci.example.com/".to_owned());
    assert!(config.jenkins.is_own_origin("https://ci.example.com/job/a/1/consoleText"));
    assert!(!config.jenkins.is_own_origin("http://ci.example.com/job/a/1/"));
    assert!(!config.jenkins.is_own_origin("https://ci.example.com:8443/job/a/1/"));
    assert!(!config.jenkins.is_own_origin("https://ci.example.com.evil.test/job/a/1/"));
    assert!(!config.jenkins.is_own_origin("not a url"));
}
