//! chef-client command line assembly.
//!
//! Pure string assembly: callers check the filesystem and read the clock,
//! then pass the results in.
use crate::process::CommandLine;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const ENGINE_PROGRAM: &str = "chef-client";
/// Engine state folder beneath the target folder.
pub const ENGINE_STATE_DIR: &str = ".chef";
/// Generated engine config, relative to the target folder.
pub const CUSTOM_CONFIG_FILE: &str = "custom_client.rb";
pub const ATTRIBUTES_FILE: &str = "attributes.json";

/// Inputs for one engine invocation.
#[derive(Debug, Clone, Default)]
pub struct EngineRunOptions<'a> {
    pub named_run_list: Option<&'a str>,
    pub run_list_override: Option<&'a str>,
    pub debug: bool,
    pub attributes_present: bool,
}

/// Build the chef-client invocation, run from inside `target_folder`.
pub fn build(target_folder: &Path, options: &EngineRunOptions<'_>, timestamp: u64) -> CommandLine {
    let mut args: Vec<String> = vec![
        "--minimal-ohai".to_string(),
        "-c".to_string(),
        CUSTOM_CONFIG_FILE.to_string(),
        "-z".to_string(),
    ];
    if let Some(named) = options.named_run_list {
        args.push("-n".to_string());
        args.push(named.to_string());
    }
    if let Some(run_list) = options.run_list_override {
        args.push("-o".to_string());
        args.push(run_list.to_string());
    }
    if options.debug {
        args.push("-l".to_string());
        args.push("debug".to_string());
    }
    if options.attributes_present {
        args.push("-j".to_string());
        args.push(ATTRIBUTES_FILE.to_string());
    }
    args.push("--lockfile".to_string());
    args.push(lock_file_path(target_folder, timestamp).display().to_string());

    CommandLine::new(ENGINE_PROGRAM, args).in_dir(target_folder)
}

/// Per-run lock file so a stale lock from an earlier run is never reused.
pub fn lock_file_path(target_folder: &Path, timestamp: u64) -> PathBuf {
    target_folder
        .join(ENGINE_STATE_DIR)
        .join("cache")
        .join(format!("{ENGINE_PROGRAM}-running_{timestamp}.pid"))
}

pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "engine_command_tests.rs"]
mod tests;
