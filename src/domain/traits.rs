// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Every piece of real work (training, averaging, decoding,
// dataset generation) happens in an external program. The
// use cases only describe WHICH program to start with WHICH
// arguments, as an Invocation, and hand it to a CommandRunner.
//
// Implementations:
//   - SystemRunner (infra/process.rs) → spawns the process
//   - RecordingRunner (tests)         → remembers the call and
//                                       returns a scripted status
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use std::fmt;

use crate::domain::error::WrapperError;
use crate::domain::example::Example;

/// A fully specified external program call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args:    Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    /// Builder-style argument append
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Shell-like rendering, used for logs and --dry-run output
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '\'') {
                write!(f, " '{}'", arg.replace('\'', r"'\''"))?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

// ─── ExampleSource ────────────────────────────────────────────────────────────
/// Any component that can load dataset examples.
///
/// Implementations:
///   - TsvLoader → id \t sentence \t program files
pub trait ExampleSource {
    fn load_all(&self) -> Result<Vec<Example>>;
}

// ─── CommandRunner ────────────────────────────────────────────────────────────
/// Anything that can run an Invocation to completion.
pub trait CommandRunner {
    /// Run the program and return its exit code.
    /// Termination by a signal is reported as exit code 1.
    fn run(&self, invocation: &Invocation) -> Result<i32>;

    /// Run the program and turn a non-zero exit code into
    /// WrapperError::ExternalFailure.
    fn run_checked(&self, invocation: &Invocation) -> Result<()> {
        let code = self.run(invocation)?;
        if code != 0 {
            return Err(WrapperError::ExternalFailure {
                program: invocation.program.clone(),
                code,
            }
            .into());
        }
        Ok(())
    }
}


// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::testing::RecordingRunner;
    use super::*;

    #[test]
    fn test_display_quotes_whitespace() {
        let inv = Invocation::new("t2t-decoder").arg("--decode_hparams=beam_size=1").arg("a b");
        assert_eq!(inv.to_string(), "t2t-decoder --decode_hparams=beam_size=1 'a b'");
    }

    #[test]
    fn test_display_escapes_single_quotes() {
        let inv = Invocation::new("python3").arg("it's here").arg("");
        assert_eq!(inv.to_string(), r"python3 'it'\''s here' ''");
    }

    #[test]
    fn test_run_checked_maps_exit_code() {
        let runner = RecordingRunner::failing_at(0, 42);
        let err    = runner.run_checked(&Invocation::new("t2t-trainer")).unwrap_err();
        let wrapped = err.downcast_ref::<WrapperError>().unwrap();
        assert_eq!(wrapped.exit_code(), 42);
    }

    #[test]
    fn test_run_checked_success() {
        let runner = RecordingRunner::default();
        assert!(runner.run_checked(&Invocation::new("true")).is_ok());
        assert_eq!(runner.programs(), vec!["true".to_string()]);
    }
}
