//! Autokill CLI
//!
//! Administers the auto-offline policy and simulates job completions against it.
//!
//! ## Commands
//!
//! - `show`: Print the persisted policy and its effective threshold
//! - `configure`: Replace the policy (rejects invalid patterns)
//! - `severities`: List threshold choices, worst first
//! - `evaluate`: Simulate one job completion on an in-memory machine

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::Level;

use autokill_core::{
    CompletionEvaluator, CompletionEvent, FleetMachine, FsConfigStore, JobListener, Machine,
    PolicyConfig, ResultSeverity,
};

#[derive(Parser, Debug)]
#[command(name = "autokill")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Take build machines offline when they fail jobs", long_about = None)]
struct Cli {
    /// Path to the persisted policy (JSON)
    #[arg(long, global = true, env = "AUTOKILL_CONFIG", default_value = "autokill.json")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the current policy
    Show,

    /// Replace the policy
    Configure {
        /// Master switch
        #[arg(long, action = ArgAction::Set)]
        enabled: bool,

        /// Regular expression searched for in machine names
        #[arg(long)]
        pattern: Option<String>,

        /// Results this bad or worse take the machine offline
        #[arg(long)]
        worse_than: Option<String>,
    },

    /// List threshold choices, worst first
    Severities,

    /// Simulate a job completion and print the decision
    Evaluate {
        /// Job result (SUCCESS, UNSTABLE, FAILURE, NOT_BUILT, ABORTED)
        #[arg(long)]
        result: ResultSeverity,

        /// Name of the machine that ran the job
        #[arg(long)]
        machine: Option<String>,

        /// Job display name
        #[arg(long, default_value = "manual run")]
        job: String,
    },
}

/// Prints job log errors to stderr.
struct ConsoleListener;

impl JobListener for ConsoleListener {
    fn error(&self, message: &str) {
        eprintln!("[job] ERROR: {message}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    autokill_core::init_tracing(cli.json, level);

    let store = Arc::new(FsConfigStore::new(&cli.config));
    let config = PolicyConfig::load(store)
        .await
        .with_context(|| format!("Failed to load policy from {}", cli.config.display()))?;

    match cli.command {
        Commands::Show => cmd_show(&config),
        Commands::Configure {
            enabled,
            pattern,
            worse_than,
        } => cmd_configure(&config, enabled, pattern.as_deref(), worse_than.as_deref()).await,
        Commands::Severities => cmd_severities(),
        Commands::Evaluate {
            result,
            machine,
            job,
        } => cmd_evaluate(config, result, machine.as_deref(), &job),
    }
}

fn cmd_show(config: &PolicyConfig) -> Result<()> {
    let settings = config.settings();
    println!("enabled:    {}", settings.enabled);
    println!(
        "pattern:    {}",
        settings.pattern.as_deref().unwrap_or("(none)")
    );
    println!(
        "worse than: {} (effective {})",
        settings.worse_than.as_deref().unwrap_or("(unset)"),
        config.threshold()
    );
    if let Err(e) = config.compiled_pattern() {
        println!("warning:    {e}");
    }
    Ok(())
}

async fn cmd_configure(
    config: &PolicyConfig,
    enabled: bool,
    pattern: Option<&str>,
    worse_than: Option<&str>,
) -> Result<()> {
    config
        .reconfigure(enabled, pattern, worse_than)
        .await
        .context("Policy not updated")?;
    println!("Policy updated.");
    cmd_show(config)
}

fn cmd_severities() -> Result<()> {
    for name in ResultSeverity::threshold_choices() {
        println!("{name}");
    }
    Ok(())
}

fn cmd_evaluate(
    config: PolicyConfig,
    result: ResultSeverity,
    machine: Option<&str>,
    job: &str,
) -> Result<()> {
    let evaluator = CompletionEvaluator::new(Arc::new(config));
    let machine = machine.map(FleetMachine::new);
    let listener = ConsoleListener;
    let event = CompletionEvent::new(
        job,
        result,
        machine.as_ref().map(|m| m as &dyn Machine),
        &listener,
    );

    let outcome = evaluator.on_completed(&event);
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if let Some(machine) = &machine {
        println!("{}", serde_json::to_string_pretty(&machine.state())?);
    }
    Ok(())
}
