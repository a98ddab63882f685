//! End-to-end checks of the `cbsdk` binary.
//!
//! `PATH` points at an empty directory, so every external tool is missing
//! and no test depends on a chef installation or the network.

mod common;

use common::ProjectFixture;
use serde_json::json;

fn slack_config(settings: serde_json::Value) -> String {
    json!({
        "handlers": {
            "enabled": ["slack"],
            "config": { "slack": settings }
        }
    })
    .to_string()
}

#[test]
fn clean_is_idempotent_on_a_fresh_project() {
    let fixture = ProjectFixture::new();

    let first = fixture.run(&["clean"]);
    let second = fixture.run(&["clean"]);

    assert_eq!(first.code, Some(0), "stderr: {}", first.stderr);
    assert_eq!(second.code, Some(0), "stderr: {}", second.stderr);
}

#[test]
fn clean_removes_generated_artifacts_only() {
    let fixture = ProjectFixture::new();
    fixture.write(".target/cookbooks/app/metadata.rb", "name 'app'\n");
    fixture.write(".target/data_bags/users/alice.json", "{}");
    fixture.write(".target/custom_client.rb", "local_mode true\n");

    let result = fixture.run(&["clean"]);

    assert_eq!(result.code, Some(0), "stderr: {}", result.stderr);
    assert!(!fixture.path(".target/cookbooks").exists());
    assert!(!fixture.path(".target/data_bags").exists());
    assert!(fixture.path(".target/custom_client.rb").is_file());
}

#[test]
fn run_without_engine_exits_with_spawn_failure_status() {
    let fixture = ProjectFixture::new();

    let result = fixture.run(&["run", "--run-list", "recipe[app]"]);

    assert_eq!(result.code, Some(127), "stderr: {}", result.stderr);
    assert!(result.stderr.contains("error: run"));
    assert!(result.stderr.contains("chef-client"));
}

#[test]
fn provision_stops_when_dependency_resolution_cannot_start() {
    let fixture = ProjectFixture::new();
    fixture.write("attributes.json", "{}");

    let result = fixture.run(&["provision"]);

    assert_eq!(result.code, Some(127), "stderr: {}", result.stderr);
    assert!(result.stderr.contains("Running 'chef update'"));
    assert!(!fixture.path(".target/attributes.json").exists());
    assert!(!fixture.path(".target/custom_client.rb").exists());
}

#[test]
fn nested_provision_folder_is_used_as_base_dir() {
    let fixture = ProjectFixture::new();
    fixture.write("provision/.target/data_bags/users/alice.json", "{}");

    let result = fixture.run(&["clean"]);

    assert_eq!(result.code, Some(0), "stderr: {}", result.stderr);
    assert!(!fixture.path("provision/.target/data_bags").exists());
}

#[test]
fn ci_reports_failure_when_tools_are_missing() {
    let fixture = ProjectFixture::new();

    let result = fixture.run(&["ci"]);

    assert_eq!(result.code, Some(1), "stderr: {}", result.stderr);
    assert!(result.stderr.contains("Running 'chef exec foodcritic -f any -P .'"));
    assert!(result.stderr.contains("Running 'chef exec rubocop'"));
    assert!(result.stderr.contains("CI checks failed"));
}

#[test]
fn notify_without_sdk_config_fails() {
    let fixture = ProjectFixture::new();

    let result = fixture.run(&["notify", "--phase", "start"]);

    assert_eq!(result.code, Some(1));
    assert!(result.stderr.contains("error:"));
}

#[test]
fn notify_rejects_blank_token() {
    let fixture = ProjectFixture::new();
    fixture.write("cookbook_sdk.json", &slack_config(json!({ "token": "  " })));

    let result = fixture.run(&["notify", "--phase", "success", "--elapsed", "3"]);

    assert_eq!(result.code, Some(1));
    assert!(result.stderr.contains("token"), "stderr: {}", result.stderr);
}

#[test]
fn notify_skips_disabled_phase() {
    let fixture = ProjectFixture::new();
    fixture.write(
        "cookbook_sdk.json",
        &slack_config(json!({ "token": "t0k3n", "on_start": false })),
    );

    let result = fixture.run(&["notify", "--phase", "start", "--node", "web-1"]);

    assert_eq!(result.code, Some(0), "stderr: {}", result.stderr);
    assert!(result.stderr.contains("Slack 'start' handler is not active."));
}

#[test]
fn notify_accepts_inline_settings_without_sdk_config() {
    let fixture = ProjectFixture::new();
    let settings = json!({ "token": "t0k3n", "on_success": false }).to_string();

    let result = fixture.run(&[
        "notify",
        "--settings",
        &settings,
        "--phase",
        "success",
        "--elapsed",
        "4.2",
        "--node",
        "web-1",
        "--run-list",
        "recipe[app]",
    ]);

    assert_eq!(result.code, Some(0), "stderr: {}", result.stderr);
    assert!(result.stderr.contains("Slack 'success' handler is not active."));
}

#[test]
fn notify_rejects_malformed_inline_settings() {
    let fixture = ProjectFixture::new();

    let result = fixture.run(&["notify", "--settings", "{not json", "--phase", "start"]);

    assert_eq!(result.code, Some(1));
    assert!(result.stderr.contains("parse --settings"), "stderr: {}", result.stderr);
}

#[test]
fn notify_delivery_failure_is_not_fatal() {
    let fixture = ProjectFixture::new();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    fixture.write(
        "cookbook_sdk.json",
        &slack_config(json!({
            "token": "t0k3n",
            "webhook_url": format!("http://127.0.0.1:{port}")
        })),
    );

    let result = fixture.run(&[
        "notify", "--phase", "failure", "--elapsed", "1.5", "--cause", "boom",
    ]);

    assert_eq!(result.code, Some(0), "stderr: {}", result.stderr);
    assert!(result.stderr.contains("posting a message to Slack"));
}

#[test]
fn missing_subcommand_prints_usage() {
    let fixture = ProjectFixture::new();

    let result = fixture.run(&[]);

    assert_eq!(result.code, Some(2));
    assert!(result.stderr.contains("Usage"));
}
