//! `validate` command - check a configuration without running anything.
//!
//! ```bash
//! activation-graph -c engine.toml validate
//! activation-graph validate --print-defaults > engine.toml
//! ```

use std::io::Write;
use std::path::Path;

use activation_graph_core::config::EngineConfig;
use activation_graph_core::error::EngineError;
use anyhow::Context;
use clap::Args;

use super::load_config;

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Print the default configuration as TOML instead of validating
    #[arg(long)]
    pub print_defaults: bool,

    /// Print the effective configuration (file plus environment overrides)
    #[arg(long, conflicts_with = "print_defaults")]
    pub show: bool,
}

/// Execute the validate command.
pub fn validate_command(config_path: Option<&Path>, args: ValidateArgs) -> anyhow::Result<()> {
    let mut out = std::io::stdout();

    if args.print_defaults {
        let toml = EngineConfig::default().to_toml_string()?;
        out.write_all(toml.as_bytes()).context("writing defaults")?;
        return Ok(());
    }

    let path = config_path.ok_or_else(|| {
        EngineError::InvalidConfig("no configuration file given (use --config)".to_string())
    })?;
    let config = load_config(Some(path))?;

    if args.show {
        out.write_all(config.to_toml_string()?.as_bytes())
            .context("writing configuration")?;
    } else {
        writeln!(out, "ok: {}", path.display()).context("writing result")?;
    }
    Ok(())
}
