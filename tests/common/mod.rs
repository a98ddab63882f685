//! Shared test infrastructure for integration tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A throwaway project root plus an empty directory used as `PATH`, so no
/// external tool is ever found.
pub struct ProjectFixture {
    root: TempDir,
    empty_path: TempDir,
}

/// Exit status and captured stderr of one `cbsdk` invocation.
#[derive(Debug)]
pub struct CliResult {
    pub code: Option<i32>,
    pub stderr: String,
}

impl ProjectFixture {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("create project root"),
            empty_path: tempfile::tempdir().expect("create empty PATH dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directory");
        }
        fs::write(path, contents).expect("write fixture file");
    }

    /// Run `cbsdk --base-dir <root> <args>` with a scrubbed environment.
    pub fn run(&self, args: &[&str]) -> CliResult {
        let output = Command::new(env!("CARGO_BIN_EXE_cbsdk"))
            .arg("--base-dir")
            .arg(self.root())
            .args(args)
            .env_clear()
            .env("PATH", self.empty_path.path())
            .env("RUST_LOG", "cbsdk=debug")
            .output()
            .expect("spawn cbsdk");
        CliResult::from(output)
    }
}

impl From<Output> for CliResult {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}
