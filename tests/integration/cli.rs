//! The `sdp` binary, run without hardware.

use std::fs;

use predicates::prelude::*;

use crate::common::cli::CliEnv;

#[test]
fn test_version_text_and_json() {
    let env = CliEnv::new();
    env.sdp()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("sdp "));

    let output = env.sdp().args(["version", "--json"]).output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert!(json["target"].is_string());
}

#[test]
fn test_completions_mention_subcommands() {
    CliEnv::new()
        .sdp()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("set-button"));
}

#[test]
fn test_page_create_and_list_offline() {
    let env = CliEnv::new();
    env.sdp()
        .args(["page", "create", "media"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Page 'media' created"));
    env.sdp()
        .args(["page", "create", "media"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    assert!(env.pages_json()["media"].is_object());
    assert!(env.pages_json()["main"].is_object());

    let output = env.sdp().args(["page", "list", "--json"]).output().unwrap();
    assert!(output.status.success());
    let pages: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<_> = pages
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["main", "media"]);
    assert_eq!(pages[0]["current"], true);
}

#[test]
fn test_set_action_offline_on_selected_page() {
    let env = CliEnv::new();
    env.sdp().args(["page", "create", "media"]).assert().success();
    env.sdp()
        .args(["--page", "media", "set-action", "4", "playerctl play-pause"])
        .assert()
        .success();
    env.sdp()
        .args(["set-action", "0", "media", "--type", "page"])
        .assert()
        .success();

    let buttons = env.buttons_json();
    assert_eq!(buttons["media"]["4"]["action"], "playerctl play-pause");
    assert_eq!(buttons["media"]["4"]["type"], "command");
    assert_eq!(buttons["main"]["0"]["action"], "page:media");
    assert_eq!(buttons["main"]["0"]["type"], "page");
}

#[test]
fn test_invalid_key_reports_error() {
    let env = CliEnv::new();
    env.sdp()
        .args(["set-action", "-1", "echo hi"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: Invalid key -1"));
}

#[test]
fn test_unknown_page_error_has_hint() {
    let env = CliEnv::new();
    env.sdp()
        .args(["--page", "nowhere", "page", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Page 'nowhere' does not exist"))
        .stderr(predicate::str::contains("Hint: Run: sdp page list"));
}

#[test]
fn test_json_errors_are_structured() {
    let env = CliEnv::new();
    let output = env
        .sdp()
        .args(["--json", "page", "delete", "main"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let json: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(json["error"], true);
    assert!(
        json["message"]
            .as_str()
            .unwrap()
            .contains("Cannot delete the 'main' page")
    );
    assert!(json.get("recoverable").is_some());
}

#[test]
fn test_device_commands_fail_without_device() {
    let env = CliEnv::new();
    env.sdp()
        .args(["set-button", "0", "--text", "Hi"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error:"));

    // Nothing was stored for the failed command
    assert!(!env.path().join("pages.json").exists());
}

#[test]
fn test_info_works_without_device() {
    let env = CliEnv::new();
    env.sdp()
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("not connected"))
        .stdout(predicate::str::contains("Page:        main"));
}

#[test]
fn test_bad_colour_is_rejected_by_parser() {
    let env = CliEnv::new();
    env.sdp()
        .args(["set-button", "0", "--bg", "1,2,x"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("'x' is not a number"));
}

#[test]
fn test_broken_config_file_is_reported() {
    let env = CliEnv::new();
    fs::write(env.path().join("config.toml"), "brightness = \"loud\"\n").unwrap();
    env.sdp()
        .args(["page", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"))
        .stderr(predicate::str::contains("config.toml"));
}

#[test]
fn test_malformed_state_does_not_break_commands() {
    let env = CliEnv::new();
    fs::write(env.path().join("pages.json"), "{{{").unwrap();
    env.sdp()
        .args(["page", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("main"));
}

#[test]
fn test_configured_log_directive_is_applied() {
    let env = CliEnv::new();
    fs::write(
        env.path().join("config.toml"),
        "[connection]\nmin_interval_ms = 0\nmax_attempts = 1\n\n[logging]\nlevel = \"sdp=debug\"\n",
    )
    .unwrap();
    env.sdp()
        .args(["page", "list"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No saved file"))
        .stderr(predicate::str::contains("Ignoring invalid log level").not());
}

#[test]
fn test_invalid_log_directive_is_warned_about() {
    let env = CliEnv::new();
    fs::write(
        env.path().join("config.toml"),
        "[connection]\nmin_interval_ms = 0\nmax_attempts = 1\n\n[logging]\nlevel = \"sdp=loud\"\n",
    )
    .unwrap();
    env.sdp()
        .args(["page", "list"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Ignoring invalid log level"));
}
