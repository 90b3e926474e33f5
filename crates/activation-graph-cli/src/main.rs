//! Activation Graph CLI
//!
//! Runs the activation engine from the command line.
//!
//! # Commands
//!
//! - `run`: interrupt-driven scheduler for a wall-clock duration, stimuli read
//!   as JSON lines, tick reports written to stdout as JSON lines
//! - `simulate`: deterministic N-tick run over a seeded synthetic graph
//! - `validate`: check a configuration file, or print the defaults
//!
//! Logs go to stderr so stdout stays machine-readable.
//!
//! # Exit Codes
//! - 0: success
//! - 1: runtime failure (I/O, persistence, engine errors)
//! - 2: invalid configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod error;

use error::{exit_code_for_error, CliExitCode};

/// Activation Graph - self-regulating energy diffusion engine
#[derive(Parser)]
#[command(name = "activation-graph")]
#[command(version)]
#[command(about = "Run, simulate and validate the activation graph engine")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long, global = true, env = "ACTIVATION_GRAPH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler against a live stimulus stream
    Run(commands::run::RunArgs),
    /// Tick a synthetic graph deterministically
    Simulate(commands::simulate::SimulateArgs),
    /// Validate a configuration file
    Validate(commands::validate::ValidateArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Run(args) => commands::run::run_command(config, args).await,
        Commands::Simulate(args) => commands::simulate::simulate_command(config, args),
        Commands::Validate(args) => commands::validate::validate_command(config, args),
    };

    let exit_code = match result {
        Ok(()) => CliExitCode::Success,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "command failed");
            eprintln!("error: {:#}", e);
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit_code.into());
}
