//! CI-mode check aggregation.
//!
//! Every check runs even when an earlier one fails; the caller exits 1 if
//! any failed.
use crate::process::{run_unchecked, CommandLine, ProcessRunner};
use std::fs;
use std::path::{Path, PathBuf};

/// Unit test files live under this folder, named `test_*.rb`.
const UNIT_TEST_DIR: &str = "test/unit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiCheck {
    pub name: &'static str,
    pub command: CommandLine,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiReport {
    pub passed: Vec<&'static str>,
    pub failed: Vec<&'static str>,
}

impl CiReport {
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }
}

/// Lint, style and unit checks for the cookbook at `base_dir`.
pub fn checks(base_dir: &Path) -> Vec<CiCheck> {
    let mut rspec_args = vec!["exec".to_string(), "rspec".to_string()];
    rspec_args.extend(
        unit_test_files(&base_dir.join(UNIT_TEST_DIR))
            .iter()
            .map(|path| path.display().to_string()),
    );
    rspec_args.extend(["--format".to_string(), "doc".to_string()]);

    vec![
        CiCheck {
            name: "foodcritic",
            command: CommandLine::new("chef", ["exec", "foodcritic", "-f", "any", "-P", "."])
                .in_dir(base_dir),
        },
        CiCheck {
            name: "rubocop",
            command: CommandLine::new("chef", ["exec", "rubocop"]).in_dir(base_dir),
        },
        CiCheck {
            name: "rspec",
            command: CommandLine::new("chef", rspec_args).in_dir(base_dir),
        },
    ]
}

pub fn run_checks(runner: &mut dyn ProcessRunner, checks: &[CiCheck]) -> CiReport {
    let mut report = CiReport::default();
    for check in checks {
        if run_unchecked(runner, &check.command) {
            report.failed.push(check.name);
        } else {
            report.passed.push(check.name);
        }
    }
    if !report.success() {
        tracing::error!(failed = ?report.failed, "CI checks failed");
    }
    report
}

fn unit_test_files(root: &Path) -> Vec<PathBuf> {
    let mut files = collect_files_recursive(root);
    files.retain(|path| {
        path.extension().is_some_and(|ext| ext == "rb")
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("test_"))
    });
    files.sort();
    files
}

fn collect_files_recursive(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = fs::read_dir(root) else {
        return files;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(collect_files_recursive(&path));
        } else {
            files.push(path);
        }
    }
    files
}
