//! Cookbook dependency resolution into the target folder.
use crate::error::PipelineError;
use crate::process::{run_checked, CommandLine, ProcessRunner};
use std::path::Path;

/// Name of the vendored cookbooks folder beneath the target folder.
pub const COOKBOOKS_DIR: &str = "cookbooks";

/// How dependencies get materialized into the target folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStrategy {
    /// `chef update` then `chef export <target> --force`.
    ManifestExport,
    /// `berks install`, `berks update`, then `berks vendor <target>/cookbooks`.
    VendorSync,
}

impl ResolveStrategy {
    pub fn select(use_vendoring: bool) -> Self {
        if use_vendoring {
            ResolveStrategy::VendorSync
        } else {
            ResolveStrategy::ManifestExport
        }
    }

    /// Whether this strategy produces the engine's base `client.rb`.
    pub fn produces_base_template(self) -> bool {
        matches!(self, ResolveStrategy::ManifestExport)
    }

    /// Commands to run, in order, for this strategy.
    pub fn commands(self, base_dir: &Path, target_folder: &Path) -> Vec<CommandLine> {
        match self {
            ResolveStrategy::ManifestExport => vec![
                CommandLine::new("chef", ["update"]).in_dir(base_dir),
                CommandLine::new(
                    "chef",
                    [
                        "export".to_string(),
                        target_folder.display().to_string(),
                        "--force".to_string(),
                    ],
                )
                .in_dir(base_dir),
            ],
            ResolveStrategy::VendorSync => {
                let berksfile = base_dir.join("Berksfile").display().to_string();
                let vendor_dir = target_folder.join(COOKBOOKS_DIR).display().to_string();
                vec![
                    CommandLine::new("berks", ["install", "--berksfile", berksfile.as_str()])
                        .in_dir(base_dir),
                    CommandLine::new("berks", ["update", "--berksfile", berksfile.as_str()])
                        .in_dir(base_dir),
                    CommandLine::new(
                        "berks",
                        ["vendor", vendor_dir.as_str(), "--berksfile", berksfile.as_str()],
                    )
                    .in_dir(base_dir),
                ]
            }
        }
    }
}

/// Run every resolution step, stopping at the first non-zero exit.
pub fn resolve(
    runner: &mut dyn ProcessRunner,
    strategy: ResolveStrategy,
    base_dir: &Path,
    target_folder: &Path,
) -> Result<(), PipelineError> {
    tracing::debug!(?strategy, "resolving cookbook dependencies");
    for command in strategy.commands(base_dir, target_folder) {
        run_checked(runner, &command)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
