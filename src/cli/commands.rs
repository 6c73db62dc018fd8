// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the subcommands and their flags.
//
// Flags are spelled with underscores (--data_dir, --num_loops)
// so command lines written for the Tensor2Tensor binaries work
// unchanged. Everything after a bare "--" on a train/evaluate
// command line reaches the trainer untouched:
//
//   luinet train --problem=... --model=... -- --train_steps=100
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::{
    eval_use_case::EvalConfig,
    score_use_case::ScoreConfig,
    train_use_case::{TrainConfig, DEFAULT_TRAINER},
};
use crate::domain::{
    family::{FamilyRule, DEFAULT_MODEL_PREFIX, DEFAULT_PROBLEM_PREFIX},
    flags::TrainerFlags,
};
use crate::infra::averager::DEFAULT_AVERAGER;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a model, optionally with perturb-training loops
    Train(TrainArgs),

    /// Evaluate a trained model on the test shard
    Evaluate(EvaluateArgs),

    /// Run the end-to-end pipeline over problems, models and grammar directions
    FunctionalTest(FunctionalTestArgs),

    /// Score decoded programs against the gold dataset
    Score(ScoreArgs),

    /// Turn t2t_results.txt lines into a per-example CSV on stdout
    Stats(StatsArgs),

    /// Count how often each grammar rule is used by a dataset
    RuleDistribution(RuleDistributionArgs),
}

/// Flags shared by the trainer and evaluator wrappers
#[derive(Args, Debug)]
pub struct TrainerArgs {
    /// Registered problem (dataset) name
    #[arg(long)]
    pub problem: String,

    /// Registered model name
    #[arg(long)]
    pub model: String,

    /// Comma-separated key=value overrides; stray commas are dropped
    #[arg(long, default_value = "")]
    pub hparams: String,

    #[arg(long = "hparams_set")]
    pub hparams_set: Option<String>,

    #[arg(long = "data_dir")]
    pub data_dir: PathBuf,

    #[arg(long = "output_dir")]
    pub output_dir: PathBuf,

    /// Directory with user-registered problems and models
    #[arg(long = "t2t_usr_dir")]
    pub t2t_usr_dir: Option<PathBuf>,

    #[arg(long)]
    pub schedule: Option<String>,

    /// Train with curriculum learning
    #[arg(long)]
    pub curriculum: bool,

    /// Problems whose names start with this belong to the LUI family
    #[arg(long = "lui_problem_prefix", default_value = DEFAULT_PROBLEM_PREFIX)]
    pub lui_problem_prefix: String,

    /// Models whose names start with this belong to the LUI family
    #[arg(long = "lui_model_prefix", default_value = DEFAULT_MODEL_PREFIX)]
    pub lui_model_prefix: String,

    /// Trainer executable
    #[arg(long, env = "LUINET_TRAINER", default_value = DEFAULT_TRAINER)]
    pub trainer: String,

    /// Extra trainer flags, after "--"
    #[arg(last = true)]
    pub passthrough: Vec<String>,
}

impl TrainerArgs {
    fn family(&self) -> FamilyRule {
        FamilyRule::new(&self.lui_problem_prefix, &self.lui_model_prefix)
    }

    fn into_flags(self, perturb_training: bool, num_loops: usize, num_last_checkpoints: Option<i64>) -> TrainerFlags {
        TrainerFlags {
            problem:     self.problem,
            model:       self.model,
            hparams:     self.hparams,
            hparams_set: self.hparams_set,
            data_dir:    self.data_dir,
            output_dir:  self.output_dir,
            t2t_usr_dir: self.t2t_usr_dir,
            schedule:    self.schedule,
            curriculum:  self.curriculum,
            perturb_training,
            num_loops,
            num_last_checkpoints,
            passthrough: self.passthrough,
        }
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub trainer: TrainerArgs,

    /// After training, repeatedly average the last checkpoints and retrain
    #[arg(long = "perturb_training")]
    pub perturb_training: bool,

    /// Number of perturb-training loops
    #[arg(long = "num_loops", default_value_t = 1)]
    pub num_loops: usize,

    /// Checkpoints averaged per loop; unset or <= 0 means 3
    #[arg(long = "num_last_checkpoints", allow_negative_numbers = true)]
    pub num_last_checkpoints: Option<i64>,

    /// Checkpoint averaging executable
    #[arg(long, env = "LUINET_AVERAGER", default_value = DEFAULT_AVERAGER)]
    pub averager: String,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        let family  = a.trainer.family();
        let trainer = a.trainer.trainer.clone();
        TrainConfig {
            flags:    a.trainer.into_flags(a.perturb_training, a.num_loops, a.num_last_checkpoints),
            family,
            trainer,
            averager: a.averager,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub trainer: TrainerArgs,
}

impl From<EvaluateArgs> for EvalConfig {
    fn from(a: EvaluateArgs) -> Self {
        let family  = a.trainer.family();
        let trainer = a.trainer.trainer.clone();
        EvalConfig {
            flags: a.trainer.into_flags(false, 0, None),
            family,
            trainer,
        }
    }
}

#[derive(Args, Debug)]
pub struct FunctionalTestArgs {
    /// JSON configuration; built-in defaults when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the plan without running anything
    #[arg(long = "dry_run")]
    pub dry_run: bool,

    /// Dataset generation executable
    #[arg(long, env = "LUINET_DATAGEN", default_value = "t2t-datagen")]
    pub datagen: String,

    /// Decoder executable
    #[arg(long, env = "LUINET_DECODER", default_value = "t2t-decoder")]
    pub decoder: String,
}

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Model configuration files, later ones override earlier ones
    #[arg(long = "model_conf", default_value = "model.json", num_args = 1..)]
    pub model_conf: Vec<PathBuf>,

    /// Where t2t_results.txt and t2t_stats.txt are written
    #[arg(long = "results_dir", default_value = "./workdir/t2t_results")]
    pub results_dir: PathBuf,

    /// Decoder output, one program per line
    #[arg(long, default_value = "./workdir/t2t_results/translation.tt")]
    pub predictions: PathBuf,

    /// Gold dataset (id, sentence, program)
    #[arg(long = "pre_t2t_data", default_value = "./dataset/test.tsv")]
    pub pre_t2t_data: PathBuf,
}

impl From<ScoreArgs> for ScoreConfig {
    fn from(a: ScoreArgs) -> Self {
        ScoreConfig {
            model_conf:  a.model_conf,
            predictions: a.predictions,
            dataset:     a.pre_t2t_data,
            results_dir: a.results_dir,
        }
    }
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Grammar file used to count productions
    #[arg(long)]
    pub grammar: PathBuf,

    #[arg(long = "grammar_type", default_value = "bottomup")]
    pub grammar_type: String,

    /// Only count parameters of this device, e.g. com.twitter
    #[arg(long)]
    pub device: Option<String>,

    /// Result lines to read; stdin when omitted
    #[arg(long)]
    pub input: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RuleDistributionArgs {
    /// Directory holding model.json
    pub model_dir: PathBuf,

    /// Dataset TSV whose programs are counted
    pub dataset: PathBuf,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::super::Cli;
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(std::iter::once("luinet").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn test_train_flags_and_passthrough() {
        let Commands::Train(args) = parse(&[
            "train",
            "--problem=semantic_parsing",
            "--model=luinet_copy_transformer",
            "--hparams=a=1,",
            "--data_dir=/d",
            "--output_dir=/o",
            "--perturb_training",
            "--num_loops",
            "2",
            "--num_last_checkpoints=-1",
            "--",
            "--train_steps=100",
        ]) else {
            panic!("expected train");
        };

        let config: TrainConfig = args.into();
        assert!(config.flags.perturb_training);
        assert_eq!(config.flags.num_loops, 2);
        assert_eq!(config.flags.num_last_checkpoints, Some(-1));
        assert_eq!(config.flags.hparams, "a=1,");
        assert_eq!(config.flags.passthrough, vec!["--train_steps=100"]);
        assert_eq!(config.family, FamilyRule::default());
    }

    #[test]
    fn test_evaluate_never_perturbs() {
        let Commands::Evaluate(args) = parse(&[
            "evaluate",
            "--problem=p",
            "--model=m",
            "--data_dir=/d",
            "--output_dir=/o",
            "--lui_problem_prefix=p",
            "--lui_model_prefix=m",
        ]) else {
            panic!("expected evaluate");
        };

        let config: EvalConfig = args.into();
        assert!(!config.flags.perturb_training);
        assert_eq!(config.family, FamilyRule::new("p", "m"));
    }

    #[test]
    fn test_missing_required_flag() {
        assert!(Cli::try_parse_from(["luinet", "train", "--problem=p"]).is_err());
    }

    #[test]
    fn test_rule_distribution_positionals() {
        let Commands::RuleDistribution(args) = parse(&["rule-distribution", "model", "train.tsv"]) else {
            panic!("expected rule-distribution");
        };
        assert_eq!(args.model_dir, PathBuf::from("model"));
    }
}
