//! Runs the `ci-assistant` binary.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;

fn workdir() -> tempfile::TempDir {
    match tempfile::tempdir() {
        Ok(tmp) => tmp,
        Err(err) => panic!("should create temp dir: {err}"),
    }
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Err(err) = fs::write(&path, contents) {
        panic!("should write {}: {err}", path.display());
    }
    path
}

fn binary(dir: &Path) -> Command {
    let mut cmd = match Command::cargo_bin("ci-assistant") {
        Ok(cmd) => cmd,
        Err(err) => panic!("binary should be built: {err}"),
    };
    cmd.current_dir(dir)
        .env_remove("CI_ASSISTANT_CONFIG")
        .env_remove("LLM_PROVIDER")
        .env_remove("OPENAI_API_KEY")
        .env_remove("GROQ_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = match cmd.output() {
        Ok(output) => output,
        Err(err) => panic!("binary should run: {err}"),
    };
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

const LOG: &str = "Cloning repo\nnpm ci\nERROR: lockfile out of date\nstep 3 done\n";

#[test]
fn help_lists_subcommands() {
    let tmp = workdir();
    let help = stdout_of(binary(tmp.path()).arg("--help"));
    for name in ["serve", "extract", "process", "generate-pipeline"] {
        assert!(help.contains(name), "help should mention {name}:\n{help}");
    }
}

#[test]
fn extract_defaults_to_most_recent_marker() {
    let tmp = workdir();
    let log = write(tmp.path(), "build.log", LOG);

    let out = stdout_of(binary(tmp.path()).arg("extract").arg(&log));
    assert!(out.starts_with("ERROR: lockfile out of date"));
    assert!(!out.contains("Cloning repo"));
}

#[test]
fn extract_blocks_policy_renders_summary() {
    let tmp = workdir();
    let log = write(tmp.path(), "build.log", LOG);

    let out = stdout_of(
        binary(tmp.path())
            .arg("extract")
            .arg(&log)
            .args(["--policy", "blocks", "--max-blocks", "2"]),
    );
    assert!(out.starts_with("--- Error block 1 (first 2000 chars) ---"));
    assert!(out.contains("ERROR: lockfile out of date"));
}

#[test]
fn extract_missing_file_fails() {
    let tmp = workdir();
    binary(tmp.path())
        .args(["extract", "absent.log"])
        .assert()
        .failure();
}

#[test]
fn process_without_api_key_fails() {
    let tmp = workdir();
    let payload = write(tmp.path(), "payload.json", r#"{"build": {"logs": "ERROR: x"}}"#);

    let output = match binary(tmp.path())
        .arg("process")
        .arg(&payload)
        .args(["--env-file", "missing.env"])
        .output()
    {
        Ok(output) => output,
        Err(err) => panic!("binary should run: {err}"),
    };
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("GROQ_API_KEY"), "stderr was: {stderr}");
}

#[test]
fn process_rejects_invalid_payload() {
    let tmp = workdir();
    let payload = write(tmp.path(), "payload.json", "{not json");

    binary(tmp.path())
        .arg("process")
        .arg(&payload)
        .assert()
        .failure();
}
