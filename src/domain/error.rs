// ============================================================
// Layer 3 — Wrapper Errors
// ============================================================
// The few failures that must surface as a specific process
// exit code. Everything else travels as a plain anyhow::Error
// and ends the process with exit code 1.
//
// main() downcasts the final error to WrapperError to pick
// the exit code, so these variants must be returned (or
// wrapped with .context()) rather than formatted into strings.
//
// Reference: Rust Book §9 (Error Handling)
//            thiserror crate documentation

use thiserror::Error;

/// Exit code used for every check performed by luinet itself
pub const EXIT_CHECK_FAILED: i32 = 1;

#[derive(Debug, Error)]
pub enum WrapperError {
    /// `--problem` and `--model` disagree about the LUI family
    #[error(
        "problem '{problem}' (LUI family: {problem_is_lui}) and model '{model}' \
         (LUI family: {model_is_lui}) must both be LUI or both be stock"
    )]
    FamilyMismatch {
        problem:        String,
        model:          String,
        problem_is_lui: bool,
        model_is_lui:   bool,
    },

    /// Anything other than exactly one test shard in the data directory
    #[error("expected exactly one test shard matching '{pattern}', found {found}")]
    TestShardCount { pattern: String, found: usize },

    /// An external program finished with a non-zero status
    #[error("'{program}' failed with exit code {code}")]
    ExternalFailure { program: String, code: i32 },
}

impl WrapperError {
    /// Exit code the luinet process should terminate with.
    /// External failures hand back the wrapped program's own code.
    pub fn exit_code(&self) -> i32 {
        match self {
            WrapperError::FamilyMismatch { .. } => EXIT_CHECK_FAILED,
            WrapperError::TestShardCount { .. } => EXIT_CHECK_FAILED,
            WrapperError::ExternalFailure { code, .. } => *code,
        }
    }
}

/// Find the exit code for any error chain produced by a use case.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<WrapperError>())
        .map(WrapperError::exit_code)
        .unwrap_or(EXIT_CHECK_FAILED)
}

/// Narrow an exit code to the single byte a process status holds.
/// Codes that do not fit, or that would read as success, become
/// EXIT_CHECK_FAILED.
pub fn exit_status_byte(code: i32) -> u8 {
    match u8::try_from(code) {
        Ok(0) | Err(_) => EXIT_CHECK_FAILED as u8,
        Ok(byte) => byte,
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_checks_exit_with_one() {
        let err = WrapperError::TestShardCount { pattern: "p-test*".into(), found: 2 };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_external_failure_keeps_code() {
        let err = WrapperError::ExternalFailure { program: "t2t-trainer".into(), code: 7 };
        assert_eq!(err.exit_code(), 7);
    }

    #[test]
    fn test_exit_code_found_through_context() {
        let result: anyhow::Result<()> =
            Err(WrapperError::ExternalFailure { program: "x".into(), code: 3 }.into());
        let err = result.context("training loop 2").unwrap_err();
        assert_eq!(exit_code_for(&err), 3);
    }

    #[test]
    fn test_exit_status_never_reads_as_success() {
        assert_eq!(exit_status_byte(7), 7);
        assert_eq!(exit_status_byte(255), 255);
        assert_eq!(exit_status_byte(256), 1);
        assert_eq!(exit_status_byte(-1), 1);
        assert_eq!(exit_status_byte(0), 1);
    }

    #[test]
    fn test_unrelated_error_exits_with_one() {
        let err = anyhow::anyhow!("disk full");
        assert_eq!(exit_code_for(&err), 1);
    }
}
