//! CLI commands that need no browser.

use assert_cmd::Command;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Binary isolated from any user or project configuration.
fn replay(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("semantic-replay").expect("binary built");
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("RUST_LOG")
        .env_remove("REPLAY_MAX_RETRIES")
        .env_remove("REPLAY_MAX_GLOBAL_FAILURES")
        .env_remove("REPLAY_HEADLESS")
        .env_remove("REPLAY_CHROME");
    cmd
}

fn write_json(dir: &Path, name: &str, value: &Value) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn validate_accepts_a_well_formed_workflow() {
    let home = tempfile::tempdir().unwrap();
    let workflow = write_json(
        home.path(),
        "signup.json",
        &json!({
            "name": "Signup",
            "input_schema": [{"name": "email", "type": "string", "required": true}],
            "steps": [
                {"type": "navigation", "url": "https://app.test/signup"},
                {"type": "input", "target_text": "Email", "value": "{email}"},
                {"type": "click", "target_text": "Create account"}
            ]
        }),
    );

    let output = replay(&home)
        .arg("validate")
        .arg(&workflow)
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Workflow: Signup"));
    assert!(stdout.contains("Steps: 3"));
    assert!(stdout.contains("Input: email (string, required)"));
    assert!(stdout.contains("Workflow is valid"));
}

#[test]
fn validate_rejects_unknown_placeholders() {
    let home = tempfile::tempdir().unwrap();
    let workflow = write_json(
        home.path(),
        "broken.json",
        &json!({
            "name": "Broken",
            "steps": [{"type": "input", "target_text": "Email", "value": "{email}"}]
        }),
    );

    let output = replay(&home)
        .arg("validate")
        .arg(&workflow)
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(stdout_of(&output).contains("'{email}'"));
}

#[test]
fn validate_reports_json_summary() {
    let home = tempfile::tempdir().unwrap();
    let workflow = write_json(
        home.path(),
        "scroll.json",
        &json!({
            "name": "Scroll",
            "steps": [{"type": "scroll", "scrollX": 0, "scrollY": 400}]
        }),
    );

    let output = replay(&home)
        .args(["--output", "json", "validate"])
        .arg(&workflow)
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);
    let summary: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["valid"], true);
    assert_eq!(summary["step_types"]["scroll"], 1);
}

#[test]
fn validate_fails_on_unparseable_file() {
    let home = tempfile::tempdir().unwrap();
    let path = home.path().join("garbage.json");
    fs::write(&path, "{ not json").unwrap();
    replay(&home).arg("validate").arg(&path).assert().failure();
}

#[test]
fn convert_writes_semantic_workflow_next_to_input() {
    let home = tempfile::tempdir().unwrap();
    let recorded = write_json(
        home.path(),
        "checkout.json",
        &json!({
            "name": "Checkout",
            "steps": [
                {"type": "navigation", "url": "https://shop.test/"},
                {"type": "click", "cssSelector": "#place-order", "elementText": "Place order"}
            ]
        }),
    );

    replay(&home).arg("convert").arg(&recorded).assert().success();

    let converted: Value =
        serde_json::from_str(&fs::read_to_string(home.path().join("checkout.semantic.json")).unwrap())
            .unwrap();
    assert_eq!(converted["name"], "Checkout (Semantic)");
    assert_eq!(converted["steps"][1]["target_text"], "Place order");
    assert_eq!(converted["steps"][1]["cssSelector"], "#place-order");
}

#[test]
fn convert_honours_output_flag() {
    let home = tempfile::tempdir().unwrap();
    let recorded = write_json(
        home.path(),
        "login.json",
        &json!({
            "name": "Login",
            "steps": [{"type": "input", "cssSelector": "input[name=\"username\"]", "value": "{user}"}]
        }),
    );
    let destination = home.path().join("out.json");

    replay(&home)
        .arg("convert")
        .arg(&recorded)
        .arg("-o")
        .arg(&destination)
        .assert()
        .success();
    let converted: Value =
        serde_json::from_str(&fs::read_to_string(&destination).unwrap()).unwrap();
    assert_eq!(converted["steps"][0]["target_text"], "username");
}

#[test]
fn config_show_prints_defaults() {
    let home = tempfile::tempdir().unwrap();
    let output = replay(&home).args(["config", "show"]).output().unwrap();
    assert!(output.status.success(), "{:?}", output);
    let stdout = stdout_of(&output);
    assert!(stdout.contains("built-in defaults"));
    assert!(stdout.contains("max_retries: 3"));
    assert!(stdout.contains("model: gpt-4o-mini"));
}

#[test]
fn config_show_uses_project_file_and_env_overrides() {
    let home = tempfile::tempdir().unwrap();
    fs::create_dir_all(home.path().join("config")).unwrap();
    fs::write(
        home.path().join("config/config.yaml"),
        "engine:\n  max_retries: 2\n  retry_delay_ms: 50\n",
    )
    .unwrap();

    let output = replay(&home)
        .env("REPLAY_MAX_GLOBAL_FAILURES", "9")
        .args(["--output", "json", "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);
    let config: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(config["engine"]["max_retries"], 2);
    assert_eq!(config["engine"]["retry_delay_ms"], 50);
    assert_eq!(config["engine"]["max_global_failures"], 9);
}

#[test]
fn config_validate_flags_limits() {
    let home = tempfile::tempdir().unwrap();
    let path = home.path().join("strict.yaml");
    fs::write(&path, "engine:\n  max_retries: 25\n").unwrap();

    let output = replay(&home)
        .arg("--config")
        .arg(&path)
        .args(["config", "validate"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(stdout_of(&output).contains("max_retries"));
}

#[test]
fn missing_explicit_config_is_an_error() {
    let home = tempfile::tempdir().unwrap();
    replay(&home)
        .args(["--config", "nowhere.yaml", "config", "show"])
        .assert()
        .failure();
}

#[test]
fn run_rejects_missing_inputs_before_launching_a_browser() {
    let home = tempfile::tempdir().unwrap();
    let workflow = write_json(
        home.path(),
        "login.json",
        &json!({
            "name": "Login",
            "input_schema": [{"name": "email", "type": "string", "required": true}],
            "steps": [{"type": "navigation", "url": "https://app.test/login"}]
        }),
    );

    let output = replay(&home)
        .env("REPLAY_CHROME", home.path().join("no-such-chrome"))
        .arg("run")
        .arg(&workflow)
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Workflow inputs rejected"), "{}", stderr);
    assert!(!stderr.contains("Failed to launch browser"), "{}", stderr);
}
