// ============================================================
// Layer 2 — StatsUseCase
// ============================================================
// Turns scored result lines (t2t_results.txt) into a CSV table
// with one row per example: sentence and program sizes, how
// many parameters the gold program sets, and the five
// correctness labels as 0/1.
//
// Parameters ("param:<name>") are counted separately inside
// and outside filters. A filter starts at the "filter" keyword
// and ends at the next function token or ")". When a device is
// given, the non-total counts only include parameters of that
// device's functions.
//
// Reference: Rust Book §13 (Iterators)

use anyhow::{Context, Result};
use std::io::{BufRead, Write};

use crate::domain::score::ResultLine;
use crate::grammar::program::ProgramGrammar;
use crate::infra::metrics::{StatsCsvWriter, StatsRow};

/// Productions counted per gold program at most
pub const MAX_PRODUCTIONS: usize = 60;

pub struct StatsUseCase {
    grammar: ProgramGrammar,
    /// e.g. "com.twitter", matched as a prefix of "@com.twitter.post"
    device:  Option<String>,
}

impl StatsUseCase {
    pub fn new(grammar: ProgramGrammar, device: Option<String>) -> Self {
        Self { grammar, device: device.map(|d| format!("@{d}")) }
    }

    /// Read result lines from `input` and write CSV rows to `output`.
    /// Returns the number of rows written.
    pub fn execute<R: BufRead, W: Write>(&self, input: R, output: W) -> Result<usize> {
        let mut writer = StatsCsvWriter::new(output)?;
        let mut rows   = 0;

        for (line_no, line) in input.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let row = self
                .row(&line)
                .with_context(|| format!("Result line {}", line_no + 1))?;
            writer.write(&row)?;
            rows += 1;
        }

        writer.into_inner()?;
        tracing::info!("Wrote {} stats rows", rows);
        Ok(rows)
    }

    fn row(&self, line: &str) -> Result<StatsRow> {
        let result = ResultLine::parse(line)?;
        let gold: Vec<String> = result.gold.split(' ').map(String::from).collect();
        let counts = count_params(&gold, self.device.as_deref());
        let productions = self.grammar.vectorize(&gold, MAX_PRODUCTIONS)?;

        Ok(StatsRow {
            sentence_length:   result.sentence.split(' ').count(),
            gold_length:       gold.len(),
            gold_num_prod:     productions.len(),
            num_total_params:  counts.total_params,
            num_total_filters: counts.total_filters,
            num_params:        counts.params,
            num_filters:       counts.filters,
            param_comb:        counts.combination.join(" "),
            ok:                result.outcome.ok_full,
            ok_grammar:        result.outcome.ok_grammar,
            ok_function:       result.outcome.ok_function,
            ok_fn_count:       result.outcome.ok_fn_count,
            ok_signature:      result.outcome.ok_signature,
        })
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ParamCounts {
    total_params:  usize,
    total_filters: usize,
    params:        usize,
    filters:       usize,
    /// Parameters of the selected device, in program order
    combination:   Vec<String>,
}

fn count_params(program: &[String], device: Option<&str>) -> ParamCounts {
    let mut counts    = ParamCounts::default();
    let mut in_device = device.is_none();
    let mut in_filter = false;

    for token in program {
        if let Some(device) = device {
            if token.starts_with(device) {
                in_device = true;
            } else if token.starts_with('@') {
                in_device = false;
            }
        }

        if token.starts_with('@') || token == ")" {
            in_filter = false;
        } else if token == "filter" {
            in_filter = true;
        } else if token.starts_with("param:") {
            if in_device {
                counts.combination.push(token.clone());
            }
            if in_filter {
                counts.total_filters += 1;
                counts.filters += usize::from(in_device);
            } else {
                counts.total_params += 1;
                counts.params += usize::from(in_device);
            }
        }
    }
    counts
}
