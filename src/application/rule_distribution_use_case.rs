// ============================================================
// Layer 2 — RuleDistributionUseCase
// ============================================================
// Counts how often each grammar rule appears in the programs
// of a dataset, encoded the same way a model is trained on
// them. Useful to spot rules that never fire, or a handful of
// rules that dominate the output vocabulary.
//
//   Step 1: Load <model_dir>'s configuration and grammar
//   Step 2: Load the dataset
//   Step 3: Vectorise every program and tally the rule ids
//
// Programs the grammar cannot parse are skipped with a warning.

use anyhow::Result;
use std::path::PathBuf;

use crate::data::loader::TsvLoader;
use crate::domain::example::Example;
use crate::domain::traits::ExampleSource;
use crate::grammar::program::ProgramGrammar;
use crate::infra::model_config::ModelConfig;

/// Usage count of one rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleCount {
    pub rule_id: usize,
    pub count:   usize,
    /// "lhs -> rhs"
    pub rule:    String,
}

pub struct RuleDistributionUseCase {
    model_dir: PathBuf,
    dataset:   PathBuf,
}

impl RuleDistributionUseCase {
    pub fn new(model_dir: impl Into<PathBuf>, dataset: impl Into<PathBuf>) -> Self {
        Self { model_dir: model_dir.into(), dataset: dataset.into() }
    }

    pub fn execute(&self) -> Result<Vec<RuleCount>> {
        // ── Step 1 ────────────────────────────────────────────────────────────
        let config  = ModelConfig::load(&ModelConfig::model_dir_layers(&self.model_dir))?;
        let grammar = config.load_grammar()?;

        // ── Step 2 ────────────────────────────────────────────────────────────
        let examples = TsvLoader::new(&self.dataset).load_all()?;

        // ── Step 3 ────────────────────────────────────────────────────────────
        Ok(count_rules(&grammar, &examples, config.input.max_length))
    }
}

/// One entry per rule, in rule id order, zero counts included.
pub fn count_rules(grammar: &ProgramGrammar, examples: &[Example], max_length: usize) -> Vec<RuleCount> {
    let mut counts  = vec![0usize; grammar.num_rules()];
    let mut skipped = 0;

    for example in examples {
        match grammar.vectorize(&example.program, max_length) {
            Ok(rules) => {
                for rule_id in rules {
                    counts[rule_id] += 1;
                }
            }
            Err(e) => {
                tracing::warn!("Skipping example {}: {}", example.id, e);
                skipped += 1;
            }
        }
    }

    tracing::info!(
        "Counted {} programs ({:?} grammar), skipped {}",
        examples.len() - skipped,
        grammar.kind().direction,
        skipped,
    );

    counts
        .into_iter()
        .enumerate()
        .map(|(rule_id, count)| RuleCount { rule_id, count, rule: grammar.rule_to_string(rule_id) })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::program::tests::test_grammar;

    #[test]
    fn test_counts_cover_every_rule() {
        let grammar  = test_grammar("bottomup");
        let examples = vec![
            Example::from_text("1", "get a comic", "@xkcd.get_comic notify"),
            Example::from_text("2", "get another", "@xkcd.get_comic notify"),
            Example::from_text("3", "broken", "@xkcd.get_comic nonsense"),
        ];

        let counts = count_rules(&grammar, &examples, 65);

        assert_eq!(counts.len(), grammar.num_rules());
        assert_eq!(counts[0].rule, "$prog -> $command");
        assert_eq!(counts[0].count, 2);
        // $rule -> $stream $action never fires
        assert_eq!(counts[2].count, 0);
        assert_eq!(counts.iter().map(|c| c.count).sum::<usize>(), 2 * 4);
    }

    #[test]
    fn test_execute_reads_model_dir_config() {
        let dir = tempfile::tempdir().unwrap();
        let grammar_path = dir.path().join("grammar.json");
        std::fs::write(&grammar_path, crate::grammar::program::tests::TEST_GRAMMAR).unwrap();
        std::fs::write(
            dir.path().join("model.json"),
            format!(r#"{{"output": {{"grammar": "topdown", "grammar_input_file": {:?}}}}}"#, grammar_path.display().to_string()),
        )
        .unwrap();
        let dataset = dir.path().join("train.tsv");
        std::fs::write(&dataset, "1\tget a comic\t@xkcd.get_comic notify\n").unwrap();

        let counts = RuleDistributionUseCase::new(dir.path(), &dataset).execute().unwrap();

        assert_eq!(counts[0].count, 1);
    }
}
