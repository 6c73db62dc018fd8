// ============================================================
// Layer 3 — Trainer Flags
// ============================================================
// The complete set of flags one trainer invocation receives.
//
// A TrainerFlags value is never mutated after it is built.
// When a run needs different flags (evaluation against the
// relocated test shard, retraining from an averaged
// checkpoint) a new record is derived with one of the
// `with_*` methods and the old one stays untouched.
//
// Example: perturb-training loop 0
//   base:    --output_dir=/work/model
//   loop 0:  --output_dir=/work/model/averaged_0
//
// Reference: Rust Book §5 (Structs — struct update syntax)

use std::path::{Path, PathBuf};

/// Checkpoints averaged per perturb-training loop when the
/// flag is unset or not positive
pub const DEFAULT_NUM_LAST_CHECKPOINTS: usize = 3;

/// Strip the stray commas a shell-assembled hyperparameter
/// string tends to carry, e.g. "a=1,b=2," or ",a=1".
///
/// The framework's parser rejects empty items, so the commas
/// must go before the string is forwarded.
pub fn normalize_hparams(hparams: &str) -> String {
    hparams
        .trim()
        .trim_matches(|c: char| c == ',' || c.is_whitespace())
        .to_string()
}

/// Number of checkpoints to average, falling back to
/// DEFAULT_NUM_LAST_CHECKPOINTS for unset or non-positive values.
pub fn effective_num_last_checkpoints(requested: Option<i64>) -> usize {
    match requested {
        Some(n) if n > 0 => n as usize,
        _ => DEFAULT_NUM_LAST_CHECKPOINTS,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainerFlags {
    pub problem:              String,
    pub model:                String,
    pub hparams:              String,
    pub hparams_set:          Option<String>,
    pub data_dir:             PathBuf,
    pub output_dir:           PathBuf,
    pub t2t_usr_dir:          Option<PathBuf>,
    pub schedule:             Option<String>,
    pub curriculum:           bool,
    pub perturb_training:     bool,
    pub num_loops:            usize,
    pub num_last_checkpoints: Option<i64>,
    /// Flags forwarded verbatim (--train_steps, --eval_steps, ...)
    pub passthrough:          Vec<String>,
}

impl TrainerFlags {
    /// Same flags with the hyperparameter string cleaned up
    pub fn with_normalized_hparams(&self) -> Self {
        Self {
            hparams: normalize_hparams(&self.hparams),
            ..self.clone()
        }
    }

    pub fn with_output_dir(&self, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..self.clone()
        }
    }

    pub fn with_data_dir(&self, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..self.clone()
        }
    }

    pub fn with_schedule(&self, schedule: impl Into<String>) -> Self {
        Self {
            schedule: Some(schedule.into()),
            ..self.clone()
        }
    }

    /// Directory that receives the averaged checkpoint of a loop.
    /// Always nested under the *original* output directory, so call
    /// this on the base flags, not on a loop's derived flags.
    pub fn averaged_dir(&self, loop_index: usize) -> PathBuf {
        averaged_dir(&self.output_dir, loop_index)
    }

    /// Build the argument list for the wrapped trainer.
    ///
    /// Perturb-training flags are consumed by luinet itself and
    /// are never forwarded. An empty hparams string is omitted.
    pub fn to_trainer_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--problem={}", self.problem),
            format!("--model={}", self.model),
        ];

        if let Some(set) = &self.hparams_set {
            args.push(format!("--hparams_set={set}"));
        }
        if !self.hparams.is_empty() {
            args.push(format!("--hparams={}", self.hparams));
        }

        args.push(format!("--data_dir={}", self.data_dir.display()));
        args.push(format!("--output_dir={}", self.output_dir.display()));

        if let Some(usr_dir) = &self.t2t_usr_dir {
            args.push(format!("--t2t_usr_dir={}", usr_dir.display()));
        }
        if let Some(schedule) = &self.schedule {
            args.push(format!("--schedule={schedule}"));
        }
        if self.curriculum {
            args.push("--curriculum".to_string());
        }

        args.extend(self.passthrough.iter().cloned());
        args
    }
}

/// `<output_dir>/averaged_<loop_index>`
pub fn averaged_dir(output_dir: &Path, loop_index: usize) -> PathBuf {
    output_dir.join(format!("averaged_{loop_index}"))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal flag record shared by tests across the crate
    pub(crate) fn sample_flags() -> TrainerFlags {
        TrainerFlags {
            problem:              "semantic_parsing_for_thingtalk".into(),
            model:                "luinet_copy_transformer".into(),
            hparams:              "".into(),
            hparams_set:          Some("lui_transformer_tiny".into()),
            data_dir:             PathBuf::from("/work/data"),
            output_dir:           PathBuf::from("/work/model"),
            t2t_usr_dir:          None,
            schedule:             None,
            curriculum:           false,
            perturb_training:     false,
            num_loops:            1,
            num_last_checkpoints: None,
            passthrough:          Vec::new(),
        }
    }

    #[test]
    fn test_strips_trailing_comma() {
        assert_eq!(normalize_hparams("a=1,b=2,"), "a=1,b=2");
    }

    #[test]
    fn test_strips_leading_and_repeated_commas() {
        assert_eq!(normalize_hparams(",,a=1,b=2,,"), "a=1,b=2");
    }

    #[test]
    fn test_only_commas_become_empty() {
        assert_eq!(normalize_hparams(" , ,"), "");
    }

    #[test]
    fn test_inner_commas_untouched() {
        assert_eq!(normalize_hparams("grammar_direction=topdown,pointer_layer=attentive"),
                   "grammar_direction=topdown,pointer_layer=attentive");
    }

    #[test]
    fn test_num_last_checkpoints_defaults() {
        assert_eq!(effective_num_last_checkpoints(None), 3);
        assert_eq!(effective_num_last_checkpoints(Some(0)), 3);
        assert_eq!(effective_num_last_checkpoints(Some(-4)), 3);
        assert_eq!(effective_num_last_checkpoints(Some(5)), 5);
    }

    #[test]
    fn test_derived_record_leaves_original_alone() {
        let base    = sample_flags();
        let derived = base.with_output_dir("/work/model/averaged_0");
        assert_eq!(base.output_dir, PathBuf::from("/work/model"));
        assert_eq!(derived.output_dir, PathBuf::from("/work/model/averaged_0"));
        assert_eq!(derived.problem, base.problem);
    }

    #[test]
    fn test_averaged_dir_naming() {
        let flags = sample_flags();
        assert_eq!(flags.averaged_dir(2), PathBuf::from("/work/model/averaged_2"));
    }

    #[test]
    fn test_trainer_args_omit_empty_hparams() {
        let args = sample_flags().to_trainer_args();
        assert!(args.iter().all(|a| !a.starts_with("--hparams=")));
        assert!(args.contains(&"--hparams_set=lui_transformer_tiny".to_string()));
    }

    #[test]
    fn test_trainer_args_forward_everything_else() {
        let mut flags = sample_flags();
        flags.hparams          = ",batch_size=8,".into();
        flags.curriculum       = true;
        flags.perturb_training = true;
        flags.passthrough      = vec!["--train_steps=3".into()];
        let args = flags.with_normalized_hparams().with_schedule("evaluate").to_trainer_args();

        assert_eq!(args, vec![
            "--problem=semantic_parsing_for_thingtalk",
            "--model=luinet_copy_transformer",
            "--hparams_set=lui_transformer_tiny",
            "--hparams=batch_size=8",
            "--data_dir=/work/data",
            "--output_dir=/work/model",
            "--schedule=evaluate",
            "--curriculum",
            "--train_steps=3",
        ]);
    }
}
