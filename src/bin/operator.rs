//! Operator CLI.
//!
//! Runs one natural-language web task through the translate → validate →
//! execute → extract pipeline and prints the summary. A pipeline failure is
//! reported as a formatted error message, never as a crash.
//!
//! Usage examples:
//!   Direct vendor (DeepSeek):
//!     $ DEEPSEEK_API_KEY=... \
//!       cargo run --bin operator -- run "search for laptops sorted by price"
//!   Cost-routed aggregator:
//!     $ OPENROUTER_API_KEY=... \
//!       cargo run --bin operator -- run "..." --provider routed
//!   Local inference server:
//!     $ cargo run --bin operator -- run "..." --provider local --show-browser

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, warn};
use operator_rs::config::{
    LoggerCallback, OperatorConfig, ProviderKind, RoutingPreferences, Verbosity,
};
use operator_rs::operator::Operator;
use operator_rs::report::{format_outcome, persist_summary};
use operator_rs::types::Task;

#[derive(Parser)]
#[command(
    name = "operator",
    author,
    version,
    about = "Natural-language web task automation"
)]
struct Cli {
    /// Increase log verbosity (pass multiple times for DEBUG).
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one task through the pipeline and print the summary.
    Run(RunArgs),
}

#[derive(Clone, Copy, ValueEnum, Debug)]
enum Provider {
    Direct,
    Routed,
    Local,
}

impl From<Provider> for ProviderKind {
    fn from(value: Provider) -> Self {
        match value {
            Provider::Direct => ProviderKind::Direct,
            Provider::Routed => ProviderKind::Routed,
            Provider::Local => ProviderKind::Local,
        }
    }
}

#[derive(Args)]
struct RunArgs {
    /// Free-text description of the web task to perform.
    task: String,

    /// Maximum number of browser actions for this run.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_steps: Option<u32>,

    /// Language-model backend to use.
    #[arg(long, value_enum)]
    provider: Option<Provider>,

    /// Override the model id for the chosen provider.
    #[arg(long)]
    model: Option<String>,

    /// Persist the summary to a file after the run.
    #[arg(long)]
    save: bool,

    /// File name for --save; defaults to summary_<YYYYMMDD_HHMMSS>.txt.
    #[arg(long, requires = "save")]
    output: Option<PathBuf>,

    /// Show the launched browser window.
    #[arg(long)]
    show_browser: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_env_logger();

    let cli = Cli::parse();
    let verbosity = verbosity_from_count(cli.verbose);

    match cli.command {
        Command::Run(args) => run_task(args, verbosity).await,
    }
}

async fn run_task(args: RunArgs, verbosity: Verbosity) -> Result<()> {
    let config = build_config(&args, verbosity).context("failed to load configuration")?;
    info!(
        "Running task via {} provider (model {})",
        config.provider_kind.as_str(),
        config.model_id
    );

    let budget = args.max_steps.unwrap_or(config.step_budget);
    let task = Task::new(args.task.clone(), budget).context("invalid step budget")?;

    let operator = match Operator::from_config(&config) {
        Ok(operator) => operator,
        Err(err) => {
            println!("Task failed (translation): {err}");
            return Ok(());
        }
    };

    match operator.run(&task).await {
        Ok(outcome) => {
            let summary = format_outcome(&task, &outcome);
            println!("{summary}");

            let metrics = operator.metrics();
            info!(
                "Run used {} prompt / {} completion tokens, {}/{} actions succeeded",
                metrics.translate_prompt_tokens,
                metrics.translate_completion_tokens,
                metrics.actions_succeeded,
                metrics.actions_attempted
            );

            if args.save {
                match persist_summary(args.output.as_deref(), &summary) {
                    Ok(path) => info!("Summary written to {}", path.display()),
                    Err(err) => warn!("Failed to persist summary: {err}"),
                }
            }
        }
        Err(err) => {
            println!("Task failed: {err}");
        }
    }

    if let Err(err) = operator.close().await {
        warn!("Failed to close browser session: {err}");
    }

    Ok(())
}

fn build_config(args: &RunArgs, verbosity: Verbosity) -> Result<OperatorConfig> {
    let mut config = OperatorConfig::from_env()?;
    config.verbose = verbosity;
    config.logger = Some(make_logger_callback());
    config.headless = !args.show_browser && config.headless;

    if let Some(provider) = args.provider {
        apply_provider_override(&mut config, provider.into());
    }

    if let Some(model) = &args.model {
        config.model_id = model.clone();
    }

    Ok(config)
}

/// Selecting a provider on the command line re-resolves the endpoint, model,
/// and credential for that kind unless explicit env overrides exist.
fn apply_provider_override(config: &mut OperatorConfig, kind: ProviderKind) {
    if config.provider_kind == kind {
        return;
    }

    config.provider_kind = kind;
    if env_var("OPERATOR_BASE_URL").is_none() {
        config.base_endpoint = kind.default_endpoint().to_string();
    }
    if env_var("OPERATOR_MODEL").is_none() {
        config.model_id = kind.default_model().to_string();
    }
    config.credential =
        env_var("OPERATOR_API_KEY").or_else(|| kind.credential_env_var().and_then(env_var));
    config.routing = match kind {
        ProviderKind::Routed => Some(RoutingPreferences {
            allow_fallbacks: true,
            ..RoutingPreferences::default()
        }),
        _ => None,
    };
}

fn env_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn make_logger_callback() -> LoggerCallback {
    Arc::new(|line: &str| {
        log::info!("{line}");
    })
}

fn verbosity_from_count(count: u8) -> Verbosity {
    match count {
        0 => Verbosity::Medium,
        _ => Verbosity::Detailed,
    }
}

fn init_env_logger() {
    if env::var("RUST_LOG").is_err() {
        unsafe {
            env::set_var("RUST_LOG", "info");
        }
    }

    let _ = env_logger::Builder::from_env(env_logger::Env::default())
        .format_timestamp_secs()
        .try_init();
}
