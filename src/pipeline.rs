//! prepare → run → clean orchestration.
//!
//! A fatal step error moves the pipeline to `Failed` and is returned to the
//! caller, which exits the process with the child's status. `provision`
//! therefore never reaches `clean` after a failed run; `cbsdk clean` is the
//! recovery step.
use crate::assemble::{self, Auxiliary, RuntimeConfigSummary};
use crate::engine_command::{self, EngineRunOptions, ATTRIBUTES_FILE};
use crate::error::PipelineError;
use crate::process::{run_checked, ProcessRunner};
use crate::resolver::{self, ResolveStrategy};
use crate::settings::PipelineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Prepared,
    Ran,
    Cleaned,
    Failed,
}

/// What prepare produced, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareReport {
    pub strategy: ResolveStrategy,
    pub attributes_copied: bool,
    pub data_bags_copied: bool,
    pub runtime_config: RuntimeConfigSummary,
}

pub struct Pipeline<'a, R: ProcessRunner> {
    config: &'a PipelineConfig,
    runner: R,
    state: PipelineState,
}

impl<'a, R: ProcessRunner> Pipeline<'a, R> {
    pub fn new(config: &'a PipelineConfig, runner: R) -> Self {
        Self {
            config,
            runner,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn runner(&self) -> &R {
        &self.runner
    }

    /// Reset the target folder, resolve dependencies, copy auxiliary inputs,
    /// generate config.
    pub fn prepare(&mut self) -> Result<PrepareReport, PipelineError> {
        let result = self.prepare_steps();
        self.state = match result {
            Ok(_) => PipelineState::Prepared,
            Err(_) => PipelineState::Failed,
        };
        result
    }

    fn prepare_steps(&mut self) -> Result<PrepareReport, PipelineError> {
        let config = self.config;
        let base_dir = config.base_dir();
        let target = config.target_folder();
        let strategy = ResolveStrategy::select(config.use_vendoring);
        tracing::info!(
            base_dir = %base_dir.display(),
            target = %target.display(),
            ?strategy,
            "preparing chef-zero environment"
        );

        assemble::reset_target(target)?;
        resolver::resolve(&mut self.runner, strategy, base_dir, target)?;
        let attributes_copied = assemble::copy_auxiliary(Auxiliary::Attributes, base_dir, target)?;
        let data_bags_copied = assemble::copy_auxiliary(Auxiliary::DataBags, base_dir, target)?;
        let runtime_config = assemble::generate_runtime_config(
            target,
            config.sdk_config_path(),
            strategy.produces_base_template(),
            config.notify_program(),
        )?;

        Ok(PrepareReport {
            strategy,
            attributes_copied,
            data_bags_copied,
            runtime_config,
        })
    }

    /// Run chef-client inside the target folder.
    pub fn run(&mut self) -> Result<(), PipelineError> {
        self.run_at(engine_command::unix_timestamp())
    }

    /// Run with an explicit lock-file timestamp.
    pub fn run_at(&mut self, timestamp: u64) -> Result<(), PipelineError> {
        let config = self.config;
        let target = config.target_folder();
        let options = EngineRunOptions {
            named_run_list: config.named_run_list.as_deref(),
            run_list_override: config.run_list_override.as_deref(),
            debug: config.debug,
            attributes_present: target.join(ATTRIBUTES_FILE).is_file(),
        };
        let command = engine_command::build(target, &options, timestamp);
        match run_checked(&mut self.runner, &command) {
            Ok(()) => {
                self.state = PipelineState::Ran;
                Ok(())
            }
            Err(err) => {
                self.state = PipelineState::Failed;
                Err(err)
            }
        }
    }

    /// Remove generated cookbooks and data bags. Safe in any state.
    pub fn clean(&mut self) -> Result<(), PipelineError> {
        assemble::clean_generated(self.config.target_folder())?;
        self.state = PipelineState::Cleaned;
        Ok(())
    }

    /// `prepare`, `run`, then `clean`, stopping at the first fatal error.
    pub fn provision(&mut self) -> Result<(), PipelineError> {
        let report = self.prepare()?;
        tracing::debug!(?report, "prepare finished");
        self.run()?;
        self.clean()
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
