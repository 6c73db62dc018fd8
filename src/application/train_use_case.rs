// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// The trainer wrapper, in order:
//
//   Step 1: Check the problem/model family    (Layer 3 - domain)
//   Step 2: Clean the hyperparameter string   (Layer 3 - domain)
//   Step 3: Run the trainer once              (Layer 6 - infra)
//   Step 4: Perturb-training loops, if asked  (Layer 6 - infra)
//
// Perturb training repeats, num_loops times:
//
//   average last K checkpoints of the current directory
//       → <output_dir>/averaged_<i>
//   retrain with --output_dir=<output_dir>/averaged_<i>
//
// so loop i continues from the mean of loop i-1's checkpoints.
// There is no early stop: every loop runs, and the first
// failing program ends the whole run with its exit code.
//
// Reference: Rust Book §9 (Error Handling, the ? operator)

use anyhow::{Context, Result};

use crate::domain::{
    family::FamilyRule,
    flags::{effective_num_last_checkpoints, TrainerFlags},
    traits::{CommandRunner, Invocation},
};
use crate::infra::averager::CheckpointAverager;

pub const DEFAULT_TRAINER: &str = "t2t-trainer";

// ─── Training Configuration ──────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub flags:    TrainerFlags,
    pub family:   FamilyRule,
    /// Trainer executable, normally t2t-trainer
    pub trainer:  String,
    /// Checkpoint averaging executable, normally t2t-avg-all
    pub averager: String,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run the trainer and the optional perturb-training loops.
    pub fn execute(&self, runner: &dyn CommandRunner) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: Problem and model must belong to the same family ─────────
        cfg.family.check(&cfg.flags.problem, &cfg.flags.model)?;

        // ── Step 2: Strip stray commas from --hparams ─────────────────────────
        let base = cfg.flags.with_normalized_hparams();
        if base.hparams != cfg.flags.hparams {
            tracing::debug!("hparams '{}' → '{}'", cfg.flags.hparams, base.hparams);
        }

        // ── Step 3: Initial training run ──────────────────────────────────────
        tracing::info!(
            "Training {} on {} into '{}'",
            base.model,
            base.problem,
            base.output_dir.display(),
        );
        self.train(runner, &base)?;

        if !base.perturb_training {
            return Ok(());
        }

        // ── Step 4: Perturb-training loops ────────────────────────────────────
        let num_last = effective_num_last_checkpoints(base.num_last_checkpoints);
        let averager = CheckpointAverager::new(&cfg.averager);
        let mut current = base.clone();

        for i in 0..base.num_loops {
            tracing::info!("Perturb-training loop {}/{}", i + 1, base.num_loops);

            let averaged = base.averaged_dir(i);
            averager
                .average(runner, &current.output_dir, &averaged, num_last)
                .with_context(|| format!("Perturb-training loop {i}"))?;

            current = base.with_output_dir(averaged);
            self.train(runner, &current)
                .with_context(|| format!("Perturb-training loop {i}"))?;
        }

        tracing::info!("Finished {} perturb-training loops", base.num_loops);
        Ok(())
    }

    fn train(&self, runner: &dyn CommandRunner, flags: &TrainerFlags) -> Result<()> {
        let invocation = Invocation::new(&self.config.trainer).args(flags.to_trainer_args());
        runner.run_checked(&invocation)
    }
}
