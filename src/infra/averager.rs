// ============================================================
// Layer 6 — Checkpoint Averager
// ============================================================
// Averages the last N checkpoints of a training directory into
// a new directory, using Tensor2Tensor's averaging tool:
//
//   t2t-avg-all --model_dir=<trained> --output_dir=<averaged> --n=<N>
//
// The averaged checkpoint's parameters are the arithmetic mean
// of the N most recent checkpoints. The file format and the
// arithmetic stay inside the external tool; this module only
// prepares the target directory and describes the call.
//
// Directory layout during perturb training:
//   model/
//     model.ckpt-1000.*      ← base training run
//     averaged_0/            ← mean of the last N above, then retrained
//     averaged_1/            ← mean of the last N in averaged_0, ...

use anyhow::{Context, Result};
use std::{fs, path::Path};

use crate::domain::traits::{CommandRunner, Invocation};

pub const DEFAULT_AVERAGER: &str = "t2t-avg-all";

pub struct CheckpointAverager {
    program: String,
}

impl CheckpointAverager {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }

    pub fn invocation(&self, model_dir: &Path, output_dir: &Path, num_last: usize) -> Invocation {
        Invocation::new(&self.program)
            .arg(format!("--model_dir={}", model_dir.display()))
            .arg(format!("--output_dir={}", output_dir.display()))
            .arg(format!("--n={num_last}"))
    }

    /// Average the last `num_last` checkpoints of `model_dir` into `output_dir`.
    pub fn average(
        &self,
        runner:     &dyn CommandRunner,
        model_dir:  &Path,
        output_dir: &Path,
        num_last:   usize,
    ) -> Result<()> {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Cannot create '{}'", output_dir.display()))?;

        tracing::info!(
            "Averaging last {} checkpoints of '{}' into '{}'",
            num_last,
            model_dir.display(),
            output_dir.display(),
        );
        runner
            .run_checked(&self.invocation(model_dir, output_dir, num_last))
            .with_context(|| format!("Checkpoint averaging of '{}' failed", model_dir.display()))
    }
}

impl Default for CheckpointAverager {
    fn default() -> Self {
        Self::new(DEFAULT_AVERAGER)
    }
}
