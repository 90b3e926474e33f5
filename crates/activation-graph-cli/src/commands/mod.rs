//! CLI command handlers
//!
//! # Modules
//!
//! - `run`: live scheduler with JSON-lines stimulus intake
//! - `simulate`: seeded synthetic graph ticked deterministically
//! - `validate`: configuration checks

pub mod run;
pub mod simulate;
pub mod validate;

use std::io::Write;
use std::path::Path;

use activation_graph_core::config::EngineConfig;
use activation_graph_core::engine::TickReport;
use anyhow::Context;
use tracing::{debug, info};

/// Load the configuration file (or defaults), apply `ACTIVATION_GRAPH_*`
/// overrides, then validate. Fails before any engine is built.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let config = match path {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            EngineConfig::from_file(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?
        }
        None => {
            debug!("no configuration file, using defaults");
            EngineConfig::default()
        }
    }
    .with_env_overrides();

    config.validate().context("validating configuration")?;
    Ok(config)
}

/// Write one report as a JSON line.
pub fn emit_report(out: &mut impl Write, report: &TickReport) -> anyhow::Result<()> {
    let line = report.to_json_line().context("encoding tick report")?;
    writeln!(out, "{}", line).context("writing tick report")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{exit_code_for_error, CliExitCode};
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_without_file() {
        let config = load_config(None).expect("defaults are valid");
        assert_eq!(config, EngineConfig::default().with_env_overrides());
    }

    #[test]
    fn test_invalid_file_maps_to_config_exit_code() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("bad.toml");
        std::fs::write(&path, "[scheduler]\nmin_tick_ms = 900\nmax_tick_ms = 100\n").expect("write");

        let err = load_config(Some(&path)).unwrap_err();
        assert_eq!(exit_code_for_error(&err), CliExitCode::InvalidConfig);
        assert!(format!("{:#}", err).contains("[scheduler]"));
    }

    #[test]
    fn test_unreadable_file_maps_to_config_exit_code() {
        let tmp = TempDir::new().expect("create temp dir");
        let err = load_config(Some(&tmp.path().join("absent.toml"))).unwrap_err();
        assert_eq!(exit_code_for_error(&err), CliExitCode::InvalidConfig);
    }
}
