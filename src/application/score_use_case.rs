// ============================================================
// Layer 2 — ScoreUseCase
// ============================================================
// Scores decoded programs against the gold dataset:
//
//   Step 1: Load the model configuration and its grammar
//   Step 2: Load the gold dataset and the predictions
//   Step 3: Judge every prediction         (Layer 3 - domain)
//   Step 4: Write t2t_results.txt and t2t_stats.txt
//
// Accuracies are fractions of all predictions. Program recall
// is the number of distinct gold programs predicted exactly,
// over the number of distinct gold programs.

use anyhow::{bail, Result};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::data::loader::{load_predictions, TsvLoader};
use crate::domain::example::Example;
use crate::domain::score::{Outcome, ResultLine, ScoreMetrics};
use crate::domain::traits::ExampleSource;
use crate::grammar::program::ProgramGrammar;
use crate::infra::metrics::ResultsWriter;
use crate::infra::model_config::ModelConfig;

#[derive(Debug, Clone)]
pub struct ScoreConfig {
    /// Model configuration layers, later files win
    pub model_conf:  Vec<PathBuf>,
    pub predictions: PathBuf,
    pub dataset:     PathBuf,
    pub results_dir: PathBuf,
}

pub struct ScoreUseCase {
    config: ScoreConfig,
}

impl ScoreUseCase {
    pub fn new(config: ScoreConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<ScoreMetrics> {
        let cfg = &self.config;

        // ── Step 1 ────────────────────────────────────────────────────────────
        let model   = ModelConfig::load(&cfg.model_conf)?;
        let grammar = model.load_grammar()?;

        // ── Step 2 ────────────────────────────────────────────────────────────
        let gold        = TsvLoader::new(&cfg.dataset).load_all()?;
        let predictions = load_predictions(&cfg.predictions)?;

        // ── Step 3 ────────────────────────────────────────────────────────────
        let (lines, metrics) = score(&grammar, &gold, &predictions)?;

        // ── Step 4 ────────────────────────────────────────────────────────────
        let writer = ResultsWriter::new(&cfg.results_dir)?;
        writer.write_results(&lines)?;
        let stats = writer.write_stats(&metrics)?;
        tracing::info!("Wrote metrics to '{}'", stats.display());

        Ok(metrics)
    }
}

/// Judge each prediction against the gold example on the same line.
pub fn score(
    grammar:     &ProgramGrammar,
    gold:        &[Example],
    predictions: &[Vec<String>],
) -> Result<(Vec<ResultLine>, ScoreMetrics)> {
    if predictions.is_empty() {
        bail!("No predictions to score");
    }
    if predictions.len() > gold.len() {
        bail!("{} predictions but only {} gold examples", predictions.len(), gold.len());
    }
    if predictions.len() < gold.len() {
        tracing::warn!(
            "Only {} of {} gold examples have a prediction",
            predictions.len(),
            gold.len(),
        );
    }

    let gold_programs: HashSet<&[String]> = gold.iter().map(|ex| ex.program.as_slice()).collect();
    let mut correct_programs: HashSet<&[String]> = HashSet::new();
    let mut totals = [0usize; 6];
    let mut lines  = Vec::with_capacity(predictions.len());

    for (example, decoded) in gold.iter().zip(predictions) {
        let same    = !decoded.is_empty() && grammar.compare(&example.program, decoded);
        let outcome = Outcome::judge(&example.program, decoded, same);

        let flags = [
            outcome.ok_grammar,
            outcome.ok_full,
            outcome.ok_fn_count,
            outcome.ok_device,
            outcome.ok_function,
            outcome.ok_signature,
        ];
        for (total, ok) in totals.iter_mut().zip(flags) {
            *total += usize::from(ok);
        }
        if outcome.ok_full {
            correct_programs.insert(decoded.as_slice());
        }

        lines.push(ResultLine {
            sentence:  example.sentence.join(" "),
            gold:      example.program.join(" "),
            predicted: decoded.join(" "),
            outcome,
        });
    }

    let n    = predictions.len() as f64;
    let frac = |count: usize| count as f64 / n;
    let metrics = ScoreMetrics {
        grammar_accuracy:        frac(totals[0]),
        accuracy:                frac(totals[1]),
        function_count_accuracy: frac(totals[2]),
        device_accuracy:         frac(totals[3]),
        function_accuracy:       frac(totals[4]),
        signature_accuracy:      frac(totals[5]),
        program_recall:          correct_programs.len() as f64 / gold_programs.len() as f64,
    };
    Ok((lines, metrics))
}
