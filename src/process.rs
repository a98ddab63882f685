//! External process invocation.
//!
//! Every tool the pipeline drives (dependency resolver, engine, checks) goes
//! through [`ProcessRunner`] so step ordering and abort behavior can be
//! tested without the tools installed.
use crate::error::PipelineError;
use std::path::{Path, PathBuf};
use std::process::Command;

/// A program plus its arguments, optionally pinned to a working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl CommandLine {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
        }
    }

    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Shell-quoted rendering for banners and logs.
    pub fn display(&self) -> String {
        let mut words = Vec::with_capacity(self.args.len() + 1);
        words.push(self.program.as_str());
        words.extend(self.args.iter().map(String::as_str));
        shell_words::join(words)
    }
}

/// Exit status of a finished child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    pub code: Option<i32>,
}

impl ExitOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Blocking process execution seam.
pub trait ProcessRunner {
    /// Run the command to completion with inherited stdio.
    fn run(&mut self, command: &CommandLine) -> Result<ExitOutcome, PipelineError>;
}

/// Runs commands on the host with inherited stdio and no timeout.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&mut self, command: &CommandLine) -> Result<ExitOutcome, PipelineError> {
        let program = resolve_program(&command.program)?;
        let mut child = Command::new(&program);
        child.args(&command.args);
        if let Some(cwd) = &command.cwd {
            child.current_dir(cwd);
        }
        let status = child.status().map_err(|source| PipelineError::CommandSpawn {
            program: command.program.clone(),
            source,
        })?;
        Ok(ExitOutcome {
            code: status.code(),
        })
    }
}

fn resolve_program(program: &str) -> Result<PathBuf, PipelineError> {
    if Path::new(program).components().count() > 1 {
        return Ok(PathBuf::from(program));
    }
    which::which(program).map_err(|err| PipelineError::CommandSpawn {
        program: program.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, err.to_string()),
    })
}

/// Print a banner, run the command, and turn a non-zero exit into an error.
///
/// This is the abort-on-failure flavor used by prepare and run.
pub fn run_checked(
    runner: &mut dyn ProcessRunner,
    command: &CommandLine,
) -> Result<(), PipelineError> {
    announce(command);
    let outcome = runner.run(command)?;
    if outcome.success() {
        return Ok(());
    }
    Err(PipelineError::CommandFailed {
        program: command.program.clone(),
        exit_code: outcome.code,
    })
}

/// Print a banner and run the command, reporting whether it failed.
///
/// Spawn failures count as failures rather than aborting.
pub fn run_unchecked(runner: &mut dyn ProcessRunner, command: &CommandLine) -> bool {
    announce(command);
    match runner.run(command) {
        Ok(outcome) if outcome.success() => false,
        Ok(outcome) => {
            tracing::warn!(program = %command.program, code = ?outcome.code, "command failed");
            true
        }
        Err(err) => {
            tracing::warn!("{err}");
            true
        }
    }
}

fn announce(command: &CommandLine) {
    match &command.cwd {
        Some(cwd) => tracing::info!(
            "Running '{}' inside folder '{}' ...",
            command.display(),
            cwd.display()
        ),
        None => tracing::info!("Running '{}' ...", command.display()),
    }
}


#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
