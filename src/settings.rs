//! Per-invocation pipeline settings.
//!
//! `PipelineConfig` is built once in `main` from flags and environment and
//! handed to every step by reference.
use std::path::{Path, PathBuf};

/// Handler/notifier configuration file name, looked up in the base dir.
pub const SDK_CONFIG_FILE: &str = "cookbook_sdk.json";
/// Generated working folder beneath the resolved base dir.
pub const TARGET_FOLDER: &str = ".target";
/// Optional nested folder used as the base dir when present.
pub const PROVISION_DIR: &str = "provision";
/// Program the generated engine config calls back into for notifications.
pub const DEFAULT_NOTIFY_PROGRAM: &str = "cbsdk";

pub const ENV_NAMED_RUN_LIST: &str = "NAMED_RUN_LIST";
pub const ENV_RUN_LIST: &str = "RUN_LIST";
pub const ENV_DEBUG: &str = "DEBUG";
pub const ENV_VENDOR: &str = "BERKS";

/// Immutable settings for one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    base_dir: PathBuf,
    target_folder: PathBuf,
    sdk_config_path: PathBuf,
    notify_program: PathBuf,
    pub named_run_list: Option<String>,
    pub run_list_override: Option<String>,
    pub debug: bool,
    pub use_vendoring: bool,
}

/// Flag values that take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub named_run_list: Option<String>,
    pub run_list: Option<String>,
    pub debug: bool,
    pub vendor: bool,
}

impl PipelineConfig {
    /// Build settings for `project_root`, reading run options from `env`.
    ///
    /// `env` is a lookup function so callers can supply the process
    /// environment or a fixed map.
    pub fn from_env<F>(project_root: &Path, overrides: Overrides, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| env(key).filter(|value| !value.trim().is_empty());
        Self::new(
            project_root,
            overrides.named_run_list.or_else(|| non_empty(ENV_NAMED_RUN_LIST)),
            overrides.run_list.or_else(|| non_empty(ENV_RUN_LIST)),
            overrides.debug || env(ENV_DEBUG).is_some_and(|value| is_truthy(&value)),
            overrides.vendor || env(ENV_VENDOR).is_some_and(|value| is_truthy(&value)),
        )
    }

    pub fn new(
        project_root: &Path,
        named_run_list: Option<String>,
        run_list_override: Option<String>,
        debug: bool,
        use_vendoring: bool,
    ) -> Self {
        let base_dir = resolve_base_dir(project_root);
        Self {
            target_folder: base_dir.join(TARGET_FOLDER),
            sdk_config_path: base_dir.join(SDK_CONFIG_FILE),
            notify_program: PathBuf::from(DEFAULT_NOTIFY_PROGRAM),
            base_dir,
            named_run_list,
            run_list_override,
            debug,
            use_vendoring,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn target_folder(&self) -> &Path {
        &self.target_folder
    }

    pub fn sdk_config_path(&self) -> &Path {
        &self.sdk_config_path
    }

    /// Use `program` (normally the running executable) for engine callbacks.
    pub fn with_notify_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.notify_program = program.into();
        self
    }

    pub fn notify_program(&self) -> &Path {
        &self.notify_program
    }
}

/// Prefer `<root>/provision` when the project keeps its cookbook there.
pub fn resolve_base_dir(project_root: &Path) -> PathBuf {
    let nested = project_root.join(PROVISION_DIR);
    if nested.is_dir() {
        nested
    } else {
        project_root.to_path_buf()
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
