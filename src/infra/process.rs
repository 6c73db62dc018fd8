// ============================================================
// Layer 6 — Process Runner
// ============================================================
// The production CommandRunner: starts the external program,
// lets it share our stdin/stdout/stderr (training logs stream
// straight to the terminal) and waits for it to finish.
//
// Runs are strictly sequential; nothing here spawns threads.
//
// Reference: std::process::Command documentation

use anyhow::{Context, Result};
use std::process::Command;

use crate::domain::error::EXIT_CHECK_FAILED;
use crate::domain::traits::{CommandRunner, Invocation};

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<i32> {
        tracing::info!("Running: {}", invocation);

        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .status()
            .with_context(|| format!("Failed to start '{}'", invocation.program))?;

        // None means the child was killed by a signal
        let code = status.code().unwrap_or(EXIT_CHECK_FAILED);
        if code != 0 {
            tracing::warn!("'{}' exited with code {}", invocation.program, code);
        } else {
            tracing::debug!("'{}' finished", invocation.program);
        }
        Ok(code)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_is_reported() {
        let code = SystemRunner.run(&Invocation::new("sh").args(["-c", "exit 5"])).unwrap();
        assert_eq!(code, 5);
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let result = SystemRunner.run(&Invocation::new("luinet-no-such-program-xyz"));
        assert!(result.is_err());
    }
}
