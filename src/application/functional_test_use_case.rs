// ============================================================
// Layer 2 — FunctionalTestUseCase
// ============================================================
// Drives the whole pipeline end to end through the external
// programs, with tiny step counts, to catch integration breaks:
//
//   for each problem:
//     t2t-datagen                              (once per problem)
//     for each grammar direction × model × hparams option:
//       luinet train   (hparams = grammar_direction=<dir>[,<option>])
//       t2t-decoder
//   luinet train --perturb_training --num_loops 1   (first combo)
//   retrieval baseline script
//
// Output layout under the work directory:
//
//   <workdir>/<problem>/data/
//   <workdir>/<problem>/<model>/<direction>-<option index>/
//   <workdir>/<problem>/<model>/perturb/
//
// The plan is built first, then run step by step; the first
// failing step aborts with its exit code. A dry run only
// prints the plan.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::flags::normalize_hparams;
use crate::domain::traits::{CommandRunner, Invocation};

// ─── Configuration ────────────────────────────────────────────────────────────
// Loaded from JSON; every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionalTestConfig {
    pub workdir:            PathBuf,
    /// Raw TSV datasets handed to datagen as its tmp_dir
    pub dataset_dir:        PathBuf,
    pub t2t_usr_dir:        Option<PathBuf>,
    pub problems:           Vec<String>,
    pub models:             Vec<String>,
    pub grammar_directions: Vec<String>,
    /// Extra hyperparameters, one run per entry; "" means none
    pub hparams_options:    Vec<String>,
    pub hparams_set:        String,
    pub train_steps:        u64,
    pub eval_steps:         u64,
    pub decode_hparams:     String,
    pub retrieval_program:  String,
    pub retrieval_script:   PathBuf,
}

impl Default for FunctionalTestConfig {
    fn default() -> Self {
        Self {
            workdir:            PathBuf::from("./workdir"),
            dataset_dir:        PathBuf::from("./dataset"),
            t2t_usr_dir:        Some(PathBuf::from("./luinet")),
            problems:           vec!["semantic_parsing_for_thingtalk".to_string()],
            models:             vec![
                "luinet_copy_seq2seq".to_string(),
                "luinet_copy_transformer".to_string(),
            ],
            grammar_directions: vec!["bottomup".to_string(), "topdown".to_string()],
            hparams_options:    vec![String::new(), "pointer_layer=decaying_attentive".to_string()],
            hparams_set:        "lui_transformer_tiny".to_string(),
            train_steps:        2,
            eval_steps:         2,
            decode_hparams:     "beam_size=1,return_beams=false".to_string(),
            retrieval_program:  "python3".to_string(),
            retrieval_script:   PathBuf::from("./luinet/scripts/retrieval.py"),
        }
    }
}

impl FunctionalTestConfig {
    /// Defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read functional test config '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid functional test config '{}'", path.display()))
    }
}

/// The executables the plan calls
#[derive(Debug, Clone)]
pub struct Programs {
    /// This binary, for the train steps
    pub luinet:  String,
    pub datagen: String,
    pub decoder: String,
}

/// One entry of the plan
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStep {
    pub label:      String,
    pub invocation: Invocation,
}

// ─── FunctionalTestUseCase ────────────────────────────────────────────────────
pub struct FunctionalTestUseCase {
    config:   FunctionalTestConfig,
    programs: Programs,
}

impl FunctionalTestUseCase {
    pub fn new(config: FunctionalTestConfig, programs: Programs) -> Self {
        Self { config, programs }
    }

    /// Every step, in execution order
    pub fn plan(&self) -> Vec<PlanStep> {
        let cfg = &self.config;
        let mut steps = Vec::new();

        for problem in &cfg.problems {
            let data_dir = cfg.workdir.join(problem).join("data");
            steps.push(PlanStep {
                label:      format!("datagen {problem}"),
                invocation: self.datagen(problem, &data_dir),
            });

            for direction in &cfg.grammar_directions {
                for model in &cfg.models {
                    for (index, option) in cfg.hparams_options.iter().enumerate() {
                        let hparams    = normalize_hparams(&format!("grammar_direction={direction},{option}"));
                        let output_dir = cfg.workdir.join(problem).join(model).join(format!("{direction}-{index}"));
                        let run        = format!("{problem} {model} {direction} #{index}");

                        steps.push(PlanStep {
                            label:      format!("train {run}"),
                            invocation: self.train(problem, model, &hparams, &data_dir, &output_dir, &[]),
                        });
                        steps.push(PlanStep {
                            label:      format!("decode {run}"),
                            invocation: self.decode(problem, model, &hparams, &data_dir, &output_dir),
                        });
                    }
                }
            }
        }

        if let (Some(problem), Some(model), Some(direction)) =
            (cfg.problems.first(), cfg.models.first(), cfg.grammar_directions.first())
        {
            let data_dir   = cfg.workdir.join(problem).join("data");
            let output_dir = cfg.workdir.join(problem).join(model).join("perturb");
            let hparams    = format!("grammar_direction={direction}");
            let invocation = self.train(
                problem,
                model,
                &hparams,
                &data_dir,
                &output_dir,
                &["--perturb_training", "--num_loops", "1"],
            );
            steps.push(PlanStep { label: format!("perturb-train {problem} {model}"), invocation });
        }

        steps.push(PlanStep {
            label:      "retrieval baseline".to_string(),
            invocation: Invocation::new(&cfg.retrieval_program)
                .arg(cfg.retrieval_script.display().to_string())
                .arg(format!("--train_file={}", cfg.dataset_dir.join("train.tsv").display()))
                .arg(format!("--test_file={}", cfg.dataset_dir.join("eval.tsv").display())),
        });

        steps
    }

    /// Run the plan; the first failure ends it.
    pub fn execute(&self, runner: &dyn CommandRunner) -> Result<()> {
        let plan  = self.plan();
        let total = plan.len();

        for (i, step) in plan.iter().enumerate() {
            tracing::info!("[{}/{}] {}", i + 1, total, step.label);
            runner
                .run_checked(&step.invocation)
                .with_context(|| format!("Functional test step '{}' failed", step.label))?;
        }

        tracing::info!("All {} functional test steps passed", total);
        Ok(())
    }

    fn datagen(&self, problem: &str, data_dir: &Path) -> Invocation {
        let cfg = &self.config;
        let inv = Invocation::new(&self.programs.datagen)
            .arg(format!("--problem={problem}"))
            .arg(format!("--data_dir={}", data_dir.display()))
            .arg(format!("--tmp_dir={}", cfg.dataset_dir.display()));
        self.with_usr_dir(inv)
    }

    /// `luinet train ... <extra> -- --train_steps=N --eval_steps=M`
    fn train(
        &self,
        problem:    &str,
        model:      &str,
        hparams:    &str,
        data_dir:   &Path,
        output_dir: &Path,
        extra:      &[&str],
    ) -> Invocation {
        let cfg = &self.config;
        let inv = Invocation::new(&self.programs.luinet)
            .arg("train")
            .arg(format!("--problem={problem}"))
            .arg(format!("--model={model}"))
            .arg(format!("--hparams_set={}", cfg.hparams_set))
            .arg(format!("--hparams={hparams}"))
            .arg(format!("--data_dir={}", data_dir.display()))
            .arg(format!("--output_dir={}", output_dir.display()));
        self.with_usr_dir(inv).args(extra.iter().copied()).args([
            "--".to_string(),
            format!("--train_steps={}", cfg.train_steps),
            format!("--eval_steps={}", cfg.eval_steps),
        ])
    }

    fn decode(&self, problem: &str, model: &str, hparams: &str, data_dir: &Path, output_dir: &Path) -> Invocation {
        let cfg = &self.config;
        let inv = Invocation::new(&self.programs.decoder)
            .arg(format!("--problem={problem}"))
            .arg(format!("--model={model}"))
            .arg(format!("--hparams_set={}", cfg.hparams_set))
            .arg(format!("--hparams={hparams}"))
            .arg(format!("--data_dir={}", data_dir.display()))
            .arg(format!("--output_dir={}", output_dir.display()))
            .arg(format!("--decode_hparams={}", cfg.decode_hparams))
            .arg(format!("--decode_to_file={}", output_dir.join("results.tt").display()));
        self.with_usr_dir(inv)
    }

    fn with_usr_dir(&self, inv: Invocation) -> Invocation {
        match &self.config.t2t_usr_dir {
            Some(dir) => inv.arg(format!("--t2t_usr_dir={}", dir.display())),
            None => inv,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::exit_code_for;
    use crate::domain::traits::testing::RecordingRunner;

    fn programs() -> Programs {
        Programs {
            luinet:  "luinet".to_string(),
            datagen: "t2t-datagen".to_string(),
            decoder: "t2t-decoder".to_string(),
        }
    }

    #[test]
    fn test_default_plan_shape() {
        let plan = FunctionalTestUseCase::new(FunctionalTestConfig::default(), programs()).plan();

        // datagen + 2 directions × 2 models × 2 options × (train + decode) + perturb + retrieval
        assert_eq!(plan.len(), 1 + 2 * 2 * 2 * 2 + 1 + 1);
        assert_eq!(plan[0].invocation.program, "t2t-datagen");
        assert_eq!(plan[1].invocation.args[0], "train");
        assert_eq!(plan[2].invocation.program, "t2t-decoder");
        assert_eq!(plan.last().unwrap().label, "retrieval baseline");
    }

    #[test]
    fn test_hparams_combine_direction_and_option() {
        let plan = FunctionalTestUseCase::new(FunctionalTestConfig::default(), programs()).plan();
        let hparams: Vec<&str> = plan
            .iter()
            .filter(|s| s.label.starts_with("train "))
            .filter_map(|s| s.invocation.args.iter().find_map(|a| a.strip_prefix("--hparams=")))
            .collect();

        assert_eq!(hparams[0], "grammar_direction=bottomup");
        assert_eq!(hparams[1], "grammar_direction=bottomup,pointer_layer=decaying_attentive");
        assert!(hparams.contains(&"grammar_direction=topdown"));
    }

    #[test]
    fn test_decoder_hparams_have_no_empty_items() {
        let plan = FunctionalTestUseCase::new(FunctionalTestConfig::default(), programs()).plan();
        let hparams: Vec<&str> = plan
            .iter()
            .filter(|s| s.invocation.program == "t2t-decoder")
            .filter_map(|s| s.invocation.args.iter().find_map(|a| a.strip_prefix("--hparams=")))
            .collect();

        // the decoder never goes through the trainer wrapper's cleanup
        assert_eq!(hparams.len(), 8);
        assert!(hparams.iter().all(|h| !h.ends_with(',') && !h.contains(",,")));
        assert_eq!(hparams[0], "grammar_direction=bottomup");
    }

    #[test]
    fn test_perturb_step_follows_the_grid() {
        let plan    = FunctionalTestUseCase::new(FunctionalTestConfig::default(), programs()).plan();
        let perturb = &plan[plan.len() - 2];
        let args    = &perturb.invocation.args;

        assert!(perturb.label.starts_with("perturb-train"));
        // luinet's own flags go before "--", the rest reaches the trainer
        let separator = args.iter().position(|a| a == "--").unwrap();
        let flag      = args.iter().position(|a| a == "--perturb_training").unwrap();
        assert!(flag < separator);
        assert_eq!(args[flag + 1..flag + 3], ["--num_loops", "1"]);
        assert!(args.iter().any(|a| a.ends_with("/perturb")));
    }

    #[test]
    fn test_first_failure_stops_the_run() {
        let runner  = RecordingRunner::failing_at(2, 9);
        let usecase = FunctionalTestUseCase::new(FunctionalTestConfig::default(), programs());

        let err = usecase.execute(&runner).unwrap_err();

        assert_eq!(exit_code_for(&err), 9);
        assert_eq!(runner.calls.borrow().len(), 3);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("ft.json");
        fs::write(&path, r#"{"models": ["luinet_copy_seq2seq"], "train_steps": 10}"#).unwrap();

        let cfg = FunctionalTestConfig::load(Some(&path)).unwrap();

        assert_eq!(cfg.models, vec!["luinet_copy_seq2seq"]);
        assert_eq!(cfg.train_steps, 10);
        assert_eq!(cfg.eval_steps, 2);
        assert_eq!(cfg.grammar_directions.len(), 2);
    }
}
