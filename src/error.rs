//! Error taxonomy for the provisioning pipeline.
//!
//! Only failures that must abort the pipeline live here. Degraded inputs
//! (missing attributes, unreadable handler config) are logged and skipped,
//! and notifier delivery problems never leave the notifier.
use std::path::PathBuf;
use thiserror::Error;

/// Exit status used when a program could not be started at all.
pub const EXIT_SPAWN_FAILURE: i32 = 127;

/// Errors that abort a pipeline step.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An external process ran but exited non-zero (or was killed).
    #[error("'{program}' exited with {}", .exit_code.map_or_else(|| "a signal".to_string(), |code| format!("status {code}")))]
    CommandFailed {
        program: String,
        exit_code: Option<i32>,
    },

    /// An external process could not be spawned.
    #[error("failed to start '{program}': {source}")]
    CommandSpawn {
        program: String,
        source: std::io::Error,
    },

    /// A filesystem operation the pipeline cannot continue without failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The engine-provided base configuration was expected but not found.
    #[error("base engine config not found at {path}")]
    MissingBaseTemplate { path: PathBuf },

    /// The notifier settings are invalid (e.g. no webhook token).
    #[error("invalid notifier configuration: {0}")]
    NotifierConfig(String),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    /// Host-process exit status that propagates this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::CommandFailed { exit_code, .. } => match exit_code {
                Some(code) if *code != 0 => *code,
                _ => 1,
            },
            PipelineError::CommandSpawn { .. } => EXIT_SPAWN_FAILURE,
            _ => 1,
        }
    }
}

/// Pick the process exit status for an error surfaced by a command handler.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<PipelineError>())
        .map_or(1, PipelineError::exit_code)
}
