// ============================================================
// Layer 4 — Dataset Loader
// ============================================================
// Reads the two plain-text formats the scoring tools consume.
//
// Dataset TSV (one example per line):
//   <id> \t <sentence tokens> \t <program tokens>
//
// Predictions (one decoded program per line, aligned with the
// dataset lines):
//   <program tokens>
//
// Blank lines in a dataset are skipped. Blank lines in a
// predictions file are kept: an empty prediction is a real
// (wrong) answer and must stay aligned with its gold line.
//
// Reference: Rust Book §8 (Strings), §9 (Error Handling)

use anyhow::{bail, Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::example::{tokens, Example};
use crate::domain::traits::ExampleSource;

pub struct TsvLoader {
    path: PathBuf,
}

impl TsvLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ExampleSource for TsvLoader {
    fn load_all(&self) -> Result<Vec<Example>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read dataset '{}'", self.path.display()))?;

        let mut examples = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            examples.push(parse_line(line).with_context(|| {
                format!("{}:{}", self.path.display(), line_no + 1)
            })?);
        }

        tracing::info!("Loaded {} examples from '{}'", examples.len(), self.path.display());
        Ok(examples)
    }
}

/// Split one dataset line into an Example.
/// Columns after the program (e.g. annotations) are ignored.
fn parse_line(line: &str) -> Result<Example> {
    let mut columns = line.split('\t');
    let (Some(id), Some(sentence), Some(program)) = (columns.next(), columns.next(), columns.next()) else {
        bail!("expected at least 3 tab-separated columns");
    };
    Ok(Example::from_text(id, sentence.trim(), program.trim()))
}

/// Load one tokenised program per line.
pub fn load_predictions(path: &Path) -> Result<Vec<Vec<String>>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read predictions '{}'", path.display()))?;
    let predictions: Vec<Vec<String>> = text.lines().map(tokens).collect();
    tracing::info!("Loaded {} predictions from '{}'", predictions.len(), path.display());
    Ok(predictions)
}
