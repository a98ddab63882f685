//! CLI argument parsing for the provisioning workflow.
//!
//! The CLI only maps flags onto `PipelineConfig` and dispatches; the
//! pipeline modules hold all behavior.
use crate::notifier::HANDLER_NAME;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "cbsdk",
    version,
    about = "Provision a local chef-zero environment and report run status",
    after_help = "Examples:\n  cbsdk provision\n  cbsdk prepare --vendor\n  RUN_LIST='recipe[app]' cbsdk run --debug\n  cbsdk clean\n  cbsdk notify --phase failure --elapsed 5 --cause boom\n  cbsdk ci",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Project root; a nested `provision/` folder is used when present
    #[arg(long, value_name = "DIR", default_value = ".", global = true)]
    pub base_dir: PathBuf,

    /// Emit debug-level diagnostics
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Prepare the environment, run chef-client, then clean up
    Provision(RunOptionArgs),
    /// Resolve dependencies and assemble the target folder
    Prepare(RunOptionArgs),
    /// Run chef-client inside a prepared target folder
    Run(RunOptionArgs),
    /// Remove generated cookbooks and data bags from the target folder
    Clean,
    /// Send one run-status notification using the configured handler
    Notify(NotifyArgs),
    /// Run lint, style and unit checks; exit 1 if any failed
    Ci,
}

/// Flags shared by the pipeline commands. Each overrides its env variable.
#[derive(Args, Debug, Clone, Default)]
pub struct RunOptionArgs {
    /// Named run list to apply (overrides NAMED_RUN_LIST)
    #[arg(long, value_name = "NAME")]
    pub named_run_list: Option<String>,

    /// Run list override (overrides RUN_LIST)
    #[arg(long, value_name = "LIST")]
    pub run_list: Option<String>,

    /// Run chef-client with debug logging (or set DEBUG)
    #[arg(long)]
    pub debug: bool,

    /// Resolve dependencies with berks vendor (or set BERKS)
    #[arg(long)]
    pub vendor: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Phase {
    Start,
    Success,
    Failure,
}

#[derive(Args, Debug)]
pub struct NotifyArgs {
    /// Run phase to report
    #[arg(long, value_enum)]
    pub phase: Phase,

    /// Elapsed run time in seconds (success and failure)
    #[arg(long, value_name = "SECS", default_value_t = 0.0)]
    pub elapsed: f64,

    /// Failure cause text, sent as a second message
    #[arg(long, value_name = "TEXT")]
    pub cause: Option<String>,

    /// Node name shown in the message (defaults to $HOSTNAME)
    #[arg(long, value_name = "NAME")]
    pub node: Option<String>,

    /// Run list shown in the message (defaults to RUN_LIST)
    #[arg(long, value_name = "LIST")]
    pub run_list: Option<String>,

    /// Handler name whose settings configure the notifier
    #[arg(long, value_name = "NAME", default_value = HANDLER_NAME)]
    pub handler: String,

    /// Handler settings as a JSON object, instead of reading cookbook_sdk.json
    #[arg(long, value_name = "JSON")]
    pub settings: Option<String>,
}
