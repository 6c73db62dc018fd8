// ============================================================
// Layer 3 — Scoring Types
// ============================================================
// A decoded program is compared to its gold program at several
// levels of strictness, from "anything came out at all" to
// "every token matches":
//
//   grammar     → the prediction is non-empty
//   fn count    → same number of function tokens ("@dev.fn")
//   device      → same sequence of device tokens ("@@dev")
//   function    → same sequence of function tokens
//   signature   → same functions and the same stream/action
//                 keywords (now, monitor, timer, attimer, notify)
//   full        → token-for-token equality
//
// Every level except "grammar" also requires "grammar".
//
// One ResultLine per example is written to t2t_results.txt:
//   sentence \t gold \t predicted \t True|False \t
//   CorrectGrammar \t CorrectFunction \t CorrectNumFunction \t CorrectSignature
// (each label with an "Incorrect" form).

use anyhow::{bail, Result};

/// Keywords that shape a program's signature besides its functions
const SIGNATURE_KEYWORDS: [&str; 5] = ["now", "monitor", "timer", "attimer", "notify"];

pub fn is_device(token: &str) -> bool {
    token.starts_with("@@")
}

pub fn is_function(token: &str) -> bool {
    token.starts_with('@') && !is_device(token)
}

pub fn devices(program: &[String]) -> Vec<&str> {
    program.iter().map(String::as_str).filter(|t| is_device(t)).collect()
}

pub fn functions(program: &[String]) -> Vec<&str> {
    program.iter().map(String::as_str).filter(|t| is_function(t)).collect()
}

pub fn signature(program: &[String]) -> Vec<&str> {
    program
        .iter()
        .map(String::as_str)
        .filter(|t| is_function(t) || SIGNATURE_KEYWORDS.contains(t))
        .collect()
}

// ─── Per-example outcome ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcome {
    pub ok_grammar:   bool,
    pub ok_fn_count:  bool,
    pub ok_device:    bool,
    pub ok_function:  bool,
    pub ok_signature: bool,
    pub ok_full:      bool,
}

impl Outcome {
    /// Compare a decoded program to the gold one.
    /// `same_program` decides full equivalence.
    pub fn judge(gold: &[String], decoded: &[String], same_program: bool) -> Self {
        let ok_grammar = !decoded.is_empty();
        if !ok_grammar {
            return Self::default();
        }
        let gold_functions    = functions(gold);
        let decoded_functions = functions(decoded);
        Self {
            ok_grammar,
            ok_fn_count:  gold_functions.len() == decoded_functions.len(),
            ok_device:    devices(gold) == devices(decoded),
            ok_function:  gold_functions == decoded_functions,
            ok_signature: signature(gold) == signature(decoded),
            ok_full:      same_program,
        }
    }
}

// ─── Metrics ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreMetrics {
    pub grammar_accuracy:        f64,
    pub accuracy:                f64,
    pub function_count_accuracy: f64,
    pub device_accuracy:         f64,
    pub function_accuracy:       f64,
    pub signature_accuracy:      f64,
    pub program_recall:          f64,
}

impl ScoreMetrics {
    /// Metric names and values, in report order
    pub fn entries(&self) -> [(&'static str, f64); 7] {
        [
            ("grammar_accuracy",        self.grammar_accuracy),
            ("accuracy",                self.accuracy),
            ("function_count_accuracy", self.function_count_accuracy),
            ("device_accuracy",         self.device_accuracy),
            ("function_accuracy",       self.function_accuracy),
            ("signature_accuracy",      self.signature_accuracy),
            ("program_recall",          self.program_recall),
        ]
    }
}

// ─── Result line ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultLine {
    pub sentence:  String,
    pub gold:      String,
    pub predicted: String,
    pub outcome:   Outcome,
}

fn label(ok: bool, name: &str) -> String {
    if ok { format!("Correct{name}") } else { format!("Incorrect{name}") }
}

fn parse_label(value: &str, name: &str) -> Result<bool> {
    match value.strip_prefix("Incorrect").or_else(|| value.strip_prefix("Correct")) {
        Some(rest) if rest == name => Ok(value.starts_with("Correct")),
        _ => bail!("expected Correct{name} or Incorrect{name}, found '{value}'"),
    }
}

impl ResultLine {
    pub fn to_tsv(&self) -> String {
        let o = &self.outcome;
        [
            self.sentence.clone(),
            self.gold.clone(),
            self.predicted.clone(),
            if o.ok_full { "True".to_string() } else { "False".to_string() },
            label(o.ok_grammar, "Grammar"),
            label(o.ok_function, "Function"),
            label(o.ok_fn_count, "NumFunction"),
            label(o.ok_signature, "Signature"),
        ]
        .join("\t")
    }

    /// Parse and validate one line of t2t_results.txt.
    /// The device outcome is not recorded in the file.
    pub fn parse(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        let [sentence, gold, predicted, ok, grammar, function, fn_count, sig] = fields[..] else {
            bail!("expected 8 tab-separated fields, found {}", fields.len());
        };
        let ok_full = match ok {
            "True" => true,
            "False" => false,
            other => bail!("expected True or False, found '{other}'"),
        };
        let outcome = Outcome {
            ok_grammar:   parse_label(grammar, "Grammar")?,
            ok_function:  parse_label(function, "Function")?,
            ok_fn_count:  parse_label(fn_count, "NumFunction")?,
            ok_signature: parse_label(sig, "Signature")?,
            ok_device:    false,
            ok_full,
        };
        Ok(Self {
            sentence:  sentence.to_string(),
            gold:      gold.to_string(),
            predicted: predicted.to_string(),
            outcome,
        })
    }
}
