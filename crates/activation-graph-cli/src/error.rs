//! CLI exit code handling.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Runtime failure (I/O, persistence, rejected requests)
//! - 2: Invalid configuration, nothing was run

use std::process::ExitCode;

use activation_graph_core::error::EngineError;

/// Exit codes for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CliExitCode {
    Success = 0,
    /// The command started but failed.
    Failure = 1,
    /// Configuration rejected before any work.
    InvalidConfig = 2,
}

impl From<CliExitCode> for ExitCode {
    fn from(code: CliExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<CliExitCode> for i32 {
    fn from(code: CliExitCode) -> Self {
        code as i32
    }
}

impl From<&EngineError> for CliExitCode {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::InvalidConfig(_) => CliExitCode::InvalidConfig,
            _ => CliExitCode::Failure,
        }
    }
}

/// Determine the exit code for a command failure.
///
/// Walks the `anyhow` context chain looking for an [`EngineError`]; anything
/// else is a runtime failure.
pub fn exit_code_for_error(err: &anyhow::Error) -> CliExitCode {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<EngineError>())
        .map_or(CliExitCode::Failure, CliExitCode::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use activation_graph_core::error::PersistenceError;
    use anyhow::Context;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(i32::from(CliExitCode::Success), 0);
        assert_eq!(i32::from(CliExitCode::Failure), 1);
        assert_eq!(i32::from(CliExitCode::InvalidConfig), 2);
    }

    #[test]
    fn test_invalid_config_found_through_context() {
        let err: anyhow::Result<()> =
            Err(EngineError::InvalidConfig("[scheduler] min_tick_ms".into())).context("loading config");
        let err = err.unwrap_err();
        assert_eq!(exit_code_for_error(&err), CliExitCode::InvalidConfig);
    }

    #[test]
    fn test_other_errors_are_failures() {
        let persistence = anyhow::Error::new(EngineError::Persistence(PersistenceError::Missing(
            "snapshot.json".into(),
        )));
        assert_eq!(exit_code_for_error(&persistence), CliExitCode::Failure);

        let plain = anyhow::anyhow!("stdin closed");
        assert_eq!(exit_code_for_error(&plain), CliExitCode::Failure);
    }
}
