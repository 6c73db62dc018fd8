// ============================================================
// Layer 2 — EvalUseCase
// ============================================================
// The evaluator wrapper:
//
//   Step 1: Check the problem/model family     (Layer 3 - domain)
//   Step 2: Clean the hyperparameter string    (Layer 3 - domain)
//   Step 3: Move the test shard under a dev    (Layer 4 - data)
//           name into <data_dir>/test_data
//   Step 4: Run the trainer with               (Layer 6 - infra)
//           --data_dir=<data_dir>/test_data --schedule=evaluate
//
// The framework evaluates on whatever it believes is the dev
// split, so after Step 3 the reported "dev" metrics are test
// metrics.

use anyhow::Result;

use crate::data::shard::relocate_test_shard;
use crate::domain::{
    family::FamilyRule,
    flags::TrainerFlags,
    traits::{CommandRunner, Invocation},
};

/// Trainer schedule that only evaluates the latest checkpoint
pub const EVALUATE_SCHEDULE: &str = "evaluate";

#[derive(Debug, Clone)]
pub struct EvalConfig {
    pub flags:   TrainerFlags,
    pub family:  FamilyRule,
    pub trainer: String,
}

pub struct EvalUseCase {
    config: EvalConfig,
}

impl EvalUseCase {
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self, runner: &dyn CommandRunner) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1 ────────────────────────────────────────────────────────────
        cfg.family.check(&cfg.flags.problem, &cfg.flags.model)?;

        // ── Step 2 ────────────────────────────────────────────────────────────
        let base = cfg.flags.with_normalized_hparams();

        // ── Step 3: Relocate the test shard ───────────────────────────────────
        let test_dir = relocate_test_shard(&base.data_dir, &base.problem)?;

        // ── Step 4: Evaluate ──────────────────────────────────────────────────
        let flags = base.with_data_dir(test_dir).with_schedule(EVALUATE_SCHEDULE);
        tracing::info!(
            "Evaluating '{}' on '{}'",
            flags.output_dir.display(),
            flags.data_dir.display(),
        );
        runner.run_checked(&Invocation::new(&cfg.trainer).args(flags.to_trainer_args()))
    }
}
