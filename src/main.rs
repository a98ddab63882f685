use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod assemble;
mod ci;
mod cli;
mod engine_command;
mod error;
mod notifier;
mod pipeline;
mod process;
mod resolver;
mod sdk_config;
mod settings;

use cli::{Command, NotifyArgs, Phase, RootArgs, RunOptionArgs};
use notifier::{NotifierConfig, RunContext, RunNotifier, RunStatus};
use pipeline::Pipeline;
use process::SystemRunner;
use settings::{Overrides, PipelineConfig, ENV_RUN_LIST, SDK_CONFIG_FILE};

fn main() {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    let code = match dispatch(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            error::exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

/// Logs go to stderr; `RUST_LOG` replaces the default filter.
fn init_tracing(verbose: bool) {
    let default = if verbose { "cbsdk=debug" } else { "cbsdk=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();
}

fn dispatch(args: RootArgs) -> Result<i32> {
    match &args.command {
        Command::Provision(opts) => {
            let config = pipeline_config(&args, opts);
            let mut pipeline = Pipeline::new(&config, SystemRunner);
            pipeline.provision().context("provision")?;
            tracing::debug!(state = ?pipeline.state(), "provision finished");
        }
        Command::Prepare(opts) => {
            let config = pipeline_config(&args, opts);
            let mut pipeline = Pipeline::new(&config, SystemRunner);
            let report = pipeline.prepare().context("prepare")?;
            tracing::info!(
                handlers = ?report.runtime_config.handlers,
                config = %report.runtime_config.path.display(),
                "prepare finished"
            );
        }
        Command::Run(opts) => {
            let config = pipeline_config(&args, opts);
            Pipeline::new(&config, SystemRunner).run().context("run")?;
        }
        Command::Clean => {
            let config = pipeline_config(&args, &RunOptionArgs::default());
            let mut pipeline = Pipeline::new(&config, SystemRunner);
            pipeline.clean().context("clean")?;
            tracing::debug!(state = ?pipeline.state(), "clean finished");
        }
        Command::Notify(notify) => cmd_notify(&args, notify)?,
        Command::Ci => {
            let base_dir = settings::resolve_base_dir(&args.base_dir);
            let report = ci::run_checks(&mut SystemRunner, &ci::checks(&base_dir));
            return Ok(report.exit_code());
        }
    }
    Ok(0)
}

fn pipeline_config(args: &RootArgs, opts: &RunOptionArgs) -> PipelineConfig {
    let overrides = Overrides {
        named_run_list: opts.named_run_list.clone(),
        run_list: opts.run_list.clone(),
        debug: opts.debug,
        vendor: opts.vendor,
    };
    let config =
        PipelineConfig::from_env(&args.base_dir, overrides, |key| std::env::var(key).ok());
    match std::env::current_exe() {
        Ok(exe) => config.with_notify_program(exe),
        Err(err) => {
            tracing::warn!("cannot locate the cbsdk executable, engine callbacks use PATH: {err}");
            config
        }
    }
}

fn cmd_notify(args: &RootArgs, notify: &NotifyArgs) -> Result<()> {
    let settings = match &notify.settings {
        Some(raw) => serde_json::from_str::<serde_json::Value>(raw).context("parse --settings")?,
        None => {
            let base_dir = settings::resolve_base_dir(&args.base_dir);
            let sdk_path = base_dir.join(SDK_CONFIG_FILE);
            let sdk = sdk_config::load_optional(&sdk_path).ok_or_else(|| {
                anyhow!("no readable {SDK_CONFIG_FILE} for {}", base_dir.display())
            })?;
            sdk.handler_settings(&notify.handler)
                .cloned()
                .ok_or_else(|| anyhow!("handler '{}' has no settings", notify.handler))?
        }
    };
    let config = NotifierConfig::from_settings(&settings).context("configure notifier")?;

    let context = RunContext {
        node: notify
            .node
            .clone()
            .or_else(|| std::env::var("HOSTNAME").ok())
            .unwrap_or_else(|| "localhost".to_string()),
        run_list: notify
            .run_list
            .clone()
            .or_else(|| std::env::var(ENV_RUN_LIST).ok())
            .unwrap_or_default(),
    };
    let status = match notify.phase {
        Phase::Start => RunStatus::NotStarted,
        Phase::Success => RunStatus::Succeeded {
            elapsed_secs: notify.elapsed,
        },
        Phase::Failure => RunStatus::Failed {
            elapsed_secs: notify.elapsed,
            cause: notify.cause.clone().map(String::into_bytes),
        },
    };

    let notifier = RunNotifier::new(config);
    tracing::debug!(
        channel = %notifier.config().channel,
        phase = status.phase(),
        "sending run notification"
    );
    let outcomes = notifier.report(&context, &status);
    tracing::debug!(
        deliveries = outcomes.len(),
        delivered = outcomes.iter().filter(|outcome| outcome.is_delivered()).count(),
        "notification finished"
    );
    Ok(())
}
