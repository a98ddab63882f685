use super::{Pipeline, PipelineState};
use crate::error::PipelineError;
use crate::process::testing::RecordingRunner;
use crate::resolver::ResolveStrategy;
use crate::settings::PipelineConfig;
use serde_json::json;
use std::fs;
use std::path::Path;

fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directory");
    }
    fs::write(path, contents).expect("write file");
}

/// A project root with attributes, data bags, a slack handler and the
/// `client.rb` that `chef export` would leave behind.
fn project(root: &Path) {
    write_file(&root.join("attributes.json"), r#"{"pipeline":{"action":"create"}}"#);
    write_file(&root.join("data_bags/users/alice.json"), "{}");
    write_file(
        &root.join("cookbook_sdk.json"),
        &json!({
            "handlers": {
                "enabled": ["slack"],
                "config": { "slack": { "token": "t0k3n" } }
            }
        })
        .to_string(),
    );
    write_file(&root.join(".target/client.rb"), "local_mode true\n");
}

fn config(root: &Path, vendoring: bool) -> PipelineConfig {
    PipelineConfig::new(root, None, Some("recipe[app]".to_string()), false, vendoring)
}

#[test]
fn prepare_resolves_copies_and_generates_config() {
    let root = tempfile::tempdir().expect("root");
    project(root.path());
    let config = config(root.path(), false);
    let mut pipeline = Pipeline::new(&config, RecordingRunner::default());

    let report = pipeline.prepare().expect("prepare");

    assert_eq!(pipeline.state(), PipelineState::Prepared);
    assert_eq!(report.strategy, ResolveStrategy::ManifestExport);
    assert!(report.attributes_copied);
    assert!(report.data_bags_copied);
    assert_eq!(report.runtime_config.handlers, vec!["slack"]);

    let target = root.path().join(".target");
    assert_eq!(
        pipeline.runner().rendered(),
        vec![
            "chef update".to_string(),
            format!("chef export {} --force", target.display()),
        ]
    );
    assert!(target.join("attributes.json").is_file());
    assert!(target.join("data_bags/users/alice.json").is_file());
    let custom = fs::read_to_string(target.join("custom_client.rb")).expect("custom config");
    assert!(custom.starts_with("local_mode true\n"));
    assert!(custom.contains("exception_handlers << slack_handler"));
}

#[test]
fn prepare_aborts_when_resolution_fails() {
    let root = tempfile::tempdir().expect("root");
    project(root.path());
    let config = config(root.path(), false);
    let runner = RecordingRunner::default().fail_on("chef export", 9);
    let mut pipeline = Pipeline::new(&config, runner);

    let err = pipeline.prepare().expect_err("export failure is fatal");

    assert_eq!(err.exit_code(), 9);
    assert_eq!(pipeline.state(), PipelineState::Failed);
    let target = root.path().join(".target");
    assert!(!target.join("attributes.json").exists());
    assert!(!target.join("custom_client.rb").exists());
}

#[test]
fn prepare_without_optional_inputs_still_succeeds() {
    let root = tempfile::tempdir().expect("root");
    write_file(&root.path().join(".target/client.rb"), "");
    let config = config(root.path(), false);
    let mut pipeline = Pipeline::new(&config, RecordingRunner::default());

    let report = pipeline.prepare().expect("prepare");

    assert!(!report.attributes_copied);
    assert!(!report.data_bags_copied);
    assert!(report.runtime_config.handlers.is_empty());
}

#[test]
fn vendoring_prepare_skips_base_template_copy() {
    let root = tempfile::tempdir().expect("root");
    let config = config(root.path(), true);
    let mut pipeline = Pipeline::new(&config, RecordingRunner::default());

    let report = pipeline.prepare().expect("prepare");

    assert_eq!(report.strategy, ResolveStrategy::VendorSync);
    let rendered = pipeline.runner().rendered();
    assert_eq!(rendered.len(), 3);
    assert!(rendered[2].starts_with("berks vendor "));
    let custom = fs::read_to_string(root.path().join(".target/custom_client.rb")).expect("custom");
    assert!(custom.contains("cache_path"));
}

#[test]
fn repeated_vendoring_prepare_keeps_one_generated_section() {
    let root = tempfile::tempdir().expect("root");
    project(root.path());
    let config = config(root.path(), true);
    let mut pipeline = Pipeline::new(&config, RecordingRunner::default());

    pipeline.prepare().expect("first prepare");
    pipeline.prepare().expect("second prepare");

    let custom = fs::read_to_string(root.path().join(".target/custom_client.rb")).expect("custom");
    assert_eq!(custom.matches("\n# Handler slack\n").count(), 1);
    assert_eq!(custom.matches("cache_path ").count(), 1);
    assert_eq!(custom.matches("start_handlers << slack_handler").count(), 1);
    assert!(custom.contains("CookbookSdkNotifyHandler.new('cbsdk', 'slack'"));

    fs::remove_file(root.path().join("attributes.json")).expect("remove source attributes");
    pipeline.prepare().expect("third prepare");
    assert!(!root.path().join(".target/attributes.json").exists());

    pipeline.run_at(7).expect("run");
    let engine = pipeline.runner().calls.last().expect("engine call");
    assert!(!engine.args.iter().any(|arg| arg == "-j"));
}

#[test]
fn run_invokes_engine_in_target_with_attributes_and_lock() {
    let root = tempfile::tempdir().expect("root");
    write_file(&root.path().join(".target/attributes.json"), "{}");
    let config = config(root.path(), false);
    let mut pipeline = Pipeline::new(&config, RecordingRunner::default());

    pipeline.run_at(1_234).expect("run");

    assert_eq!(pipeline.state(), PipelineState::Ran);
    let call = &pipeline.runner().calls[0];
    let target = root.path().join(".target");
    assert_eq!(call.program, "chef-client");
    assert_eq!(call.cwd.as_deref(), Some(target.as_path()));
    let args = call.args.join(" ");
    assert!(args.contains("-o recipe[app]"));
    assert!(args.contains("-j attributes.json"));
    assert!(!args.contains("-l debug"));
    assert!(args.ends_with(&format!(
        "{}",
        target
            .join(".chef/cache/chef-client-running_1234.pid")
            .display()
    )));
}

#[test]
fn failed_run_propagates_engine_status() {
    let root = tempfile::tempdir().expect("root");
    let config = config(root.path(), false);
    let runner = RecordingRunner::default().fail_on("chef-client", 3);
    let mut pipeline = Pipeline::new(&config, runner);

    let err = pipeline.run_at(1).expect_err("engine failure is fatal");

    assert!(matches!(
        err,
        PipelineError::CommandFailed {
            exit_code: Some(3),
            ..
        }
    ));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(pipeline.state(), PipelineState::Failed);
}

#[test]
fn provision_cleans_after_successful_run() {
    let root = tempfile::tempdir().expect("root");
    project(root.path());
    let config = config(root.path(), false);
    let mut pipeline = Pipeline::new(&config, RecordingRunner::default());

    pipeline.provision().expect("provision");

    assert_eq!(pipeline.state(), PipelineState::Cleaned);
    assert_eq!(pipeline.runner().calls.len(), 3);
    assert!(!root.path().join(".target/data_bags").exists());
}

#[test]
fn provision_leaves_artifacts_when_run_fails() {
    let root = tempfile::tempdir().expect("root");
    project(root.path());
    let config = config(root.path(), false);
    let runner = RecordingRunner::default().fail_on("chef-client", 1);
    let mut pipeline = Pipeline::new(&config, runner);

    pipeline.provision().expect_err("run failure is fatal");

    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(root.path().join(".target/data_bags/users/alice.json").is_file());

    pipeline.clean().expect("explicit recovery clean");
    assert!(!root.path().join(".target/data_bags").exists());
}

#[test]
fn clean_is_safe_on_a_fresh_project() {
    let root = tempfile::tempdir().expect("root");
    let config = config(root.path(), false);
    let mut pipeline = Pipeline::new(&config, RecordingRunner::default());

    pipeline.clean().expect("first clean");
    pipeline.clean().expect("second clean");

    assert_eq!(pipeline.state(), PipelineState::Cleaned);
    assert!(pipeline.runner().calls.is_empty());
}
