// ============================================================
// Layer 6 — Result and Statistics Writers
// ============================================================
// Output files of the scoring tools.
//
// Scoring writes two files into the results directory:
//
//   t2t_results.txt   one tab-separated ResultLine per example
//   t2t_stats.txt     one "key : value" line per metric
//
//   grammar_accuracy : 1.0
//   accuracy : 0.5
//   ...
//
// The stats tool turns result lines into a CSV table, one row
// per example, for plotting accuracy against program size:
//
//   sentence_length,gold_length,gold_num_prod,...,ok_signature
//   4,6,3,1,0,1,0,param:status,1,1,1,1,1
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::domain::score::{ResultLine, ScoreMetrics};

pub const RESULTS_FILE: &str = "t2t_results.txt";
pub const STATS_FILE:   &str = "t2t_stats.txt";

/// "key : value" lines, in report order
pub fn format_metrics(metrics: &ScoreMetrics) -> String {
    metrics
        .entries()
        .iter()
        .map(|(key, value)| format!("{key} : {value:?}\n"))
        .collect()
}

/// Writes the scoring output files into one directory.
pub struct ResultsWriter {
    dir: PathBuf,
}

impl ResultsWriter {
    /// Creates the directory if it doesn't exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create results directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn write_results(&self, lines: &[ResultLine]) -> Result<PathBuf> {
        let path = self.dir.join(RESULTS_FILE);
        let mut f = create(&path)?;
        for line in lines {
            writeln!(f, "{}", line.to_tsv())?;
        }
        f.flush()?;
        tracing::debug!("Wrote {} result lines to '{}'", lines.len(), path.display());
        Ok(path)
    }

    pub fn write_stats(&self, metrics: &ScoreMetrics) -> Result<PathBuf> {
        let path = self.dir.join(STATS_FILE);
        fs::write(&path, format_metrics(metrics))
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        Ok(path)
    }
}

fn create(path: &Path) -> Result<BufWriter<fs::File>> {
    let f = fs::File::create(path)
        .with_context(|| format!("Cannot create '{}'", path.display()))?;
    Ok(BufWriter::new(f))
}

// ─── Stats CSV ────────────────────────────────────────────────────────────────

pub const STATS_CSV_HEADER: &str = "sentence_length,gold_length,gold_num_prod,\
num_total_params,num_total_filters,num_params,num_filters,param_comb,\
ok,ok_grammar,ok_function,ok_fn_count,ok_signature";

/// One CSV row of the stats table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsRow {
    pub sentence_length:   usize,
    pub gold_length:       usize,
    pub gold_num_prod:     usize,
    pub num_total_params:  usize,
    pub num_total_filters: usize,
    pub num_params:        usize,
    pub num_filters:       usize,
    pub param_comb:        String,
    pub ok:                bool,
    pub ok_grammar:        bool,
    pub ok_function:       bool,
    pub ok_fn_count:       bool,
    pub ok_signature:      bool,
}

/// Quote a CSV field when it contains a separator, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Streams StatsRows as CSV to any writer (a file or stdout).
pub struct StatsCsvWriter<W: Write> {
    out: W,
}

impl<W: Write> StatsCsvWriter<W> {
    /// Writes the header row immediately.
    pub fn new(mut out: W) -> Result<Self> {
        writeln!(out, "{STATS_CSV_HEADER}")?;
        Ok(Self { out })
    }

    pub fn write(&mut self, row: &StatsRow) -> Result<()> {
        writeln!(
            self.out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{}",
            row.sentence_length,
            row.gold_length,
            row.gold_num_prod,
            row.num_total_params,
            row.num_total_filters,
            row.num_params,
            row.num_filters,
            csv_field(&row.param_comb),
            u8::from(row.ok),
            u8::from(row.ok_grammar),
            u8::from(row.ok_function),
            u8::from(row.ok_fn_count),
            u8::from(row.ok_signature),
        )?;
        Ok(())
    }

    pub fn into_inner(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_metrics() {
        let metrics = ScoreMetrics { grammar_accuracy: 1.0, accuracy: 0.5, ..ScoreMetrics::default() };
        let text = format_metrics(&metrics);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "grammar_accuracy : 1.0");
        assert_eq!(lines[1], "accuracy : 0.5");
        assert_eq!(lines[6], "program_recall : 0.0");
    }

    #[test]
    fn test_writer_creates_files() {
        let dir    = tempfile::tempdir().unwrap();
        let writer = ResultsWriter::new(dir.path().join("results")).unwrap();

        let stats = writer.write_stats(&ScoreMetrics::default()).unwrap();
        let results = writer.write_results(&[]).unwrap();

        assert!(stats.ends_with(STATS_FILE));
        assert_eq!(fs::read_to_string(results).unwrap(), "");
    }

    #[test]
    fn test_csv_row() {
        let mut writer = StatsCsvWriter::new(Vec::new()).unwrap();
        writer
            .write(&StatsRow {
                sentence_length: 4,
                gold_length:     6,
                gold_num_prod:   3,
                param_comb:      "param:a,b".to_string(),
                ok:              true,
                ..StatsRow::default()
            })
            .unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows[0], STATS_CSV_HEADER);
        assert_eq!(rows[1], "4,6,3,0,0,0,0,\"param:a,b\",1,0,0,0,0");
    }
}
