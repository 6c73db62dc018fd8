// ============================================================
// Grammar — Program Grammar
// ============================================================
// Connects the generic SLR machinery to the programs found in
// datasets and prediction files.
//
// A grammar file is JSON:
//
//   {
//     "start": "$prog",
//     "rules": {
//       "$prog":  [["$command"], ["$rule"]],
//       "$get":   [["$get", "$ip"], ["GET"]],
//       ...
//     },
//     "terminal_classes": { "GET": ["@com.xkcd.get_comic", ...] },
//     "prefix_classes":   { "PARAM": "param:" }
//   }
//
// Rule ids follow the order of "rules" in the file.
//
// Tokenising a program token:
//   1. listed in terminal_classes → that class
//   2. starts with a prefix_classes prefix → that class
//   3. otherwise the token must be a terminal itself
//
// The grammar "type" (from the model configuration) picks the
// direction rules are emitted in and whether function tokens
// are preceded by a separate device token.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::grammar::error::GrammarError;
use crate::grammar::parser::{ParseStep, ShiftReduceParser};
use crate::grammar::slr::{RuleSet, SlrParserGenerator};

#[derive(Debug, Clone, Deserialize)]
pub struct GrammarFile {
    pub start: String,
    pub rules: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub terminal_classes: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub prefix_classes: BTreeMap<String, String>,
}

impl GrammarFile {
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read grammar file '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid grammar file '{}'", path.display()))
    }

    /// Rules in file order
    pub fn rule_set(&self) -> Result<RuleSet> {
        self.rules
            .iter()
            .map(|(lhs, alternatives)| {
                let alternatives: Vec<Vec<String>> = serde_json::from_value(alternatives.clone())
                    .with_context(|| format!("Rules of {lhs} must be a list of symbol lists"))?;
                Ok((lhs.clone(), alternatives))
            })
            .collect()
    }
}

// ─── Grammar Type ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Reductions in the order a shift-reduce parser performs them
    BottomUp,
    /// Reductions in pre-order, root first
    TopDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrammarKind {
    pub direction:    Direction,
    pub split_device: bool,
}

/// Accepts the historical ThingTalk names as well:
///   tt, new-tt     → bottom-up
///   reverse-tt     → top-down
/// plus an optional "-split-device" suffix. The "simple" and
/// "django-*" grammars are different languages and are rejected.
impl FromStr for GrammarKind {
    type Err = GrammarError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let (base, split_device) = match name.strip_suffix("-split-device") {
            Some(base) => (base, true),
            None => (name, false),
        };
        let direction = match base {
            "bottomup" | "bottom-up" | "tt" | "new-tt" => Direction::BottomUp,
            "topdown" | "top-down" | "reverse-tt" => Direction::TopDown,
            _ => return Err(GrammarError::UnknownGrammarType(name.to_string())),
        };
        Ok(Self { direction, split_device })
    }
}

// ─── ProgramGrammar ───────────────────────────────────────────────────────────

pub struct ProgramGrammar {
    parser:         ShiftReduceParser,
    kind:           GrammarKind,
    token_classes:  HashMap<String, String>,
    prefix_classes: Vec<(String, String)>,
}

impl ProgramGrammar {
    /// Load and compile a grammar file.
    pub fn load(path: &Path, kind: GrammarKind) -> Result<Self> {
        let file = GrammarFile::load(path)?;
        let grammar = Self::from_file(&file, kind)
            .with_context(|| format!("Cannot compile grammar '{}'", path.display()))?;
        tracing::info!(
            "Loaded grammar '{}': {} rules, {} states",
            path.display(),
            grammar.parser.num_rules(),
            grammar.parser.num_states(),
        );
        Ok(grammar)
    }

    pub fn from_file(file: &GrammarFile, kind: GrammarKind) -> Result<Self> {
        let parser = SlrParserGenerator::new(file.rule_set()?, &file.start)?.build();

        let mut token_classes = HashMap::new();
        for (class, tokens) in &file.terminal_classes {
            for token in tokens {
                // first class listing a token wins
                token_classes.entry(token.clone()).or_insert_with(|| class.clone());
            }
        }
        let prefix_classes = file
            .prefix_classes
            .iter()
            .map(|(class, prefix)| (prefix.clone(), class.clone()))
            .collect();

        Ok(Self { parser, kind, token_classes, prefix_classes })
    }

    pub fn kind(&self) -> GrammarKind {
        self.kind
    }

    pub fn num_rules(&self) -> usize {
        self.parser.num_rules()
    }

    /// "lhs -> rhs" for a rule id, for reports
    pub fn rule_to_string(&self, rule_id: usize) -> String {
        self.parser
            .rule(rule_id)
            .map(|rule| rule.to_string())
            .unwrap_or_else(|| format!("<invalid rule {rule_id}>"))
    }

    /// Insert a device token "@@dev" in front of every function
    /// token "@dev.function" when the grammar type asks for it.
    pub fn preprocess(&self, program: &[String]) -> Vec<String> {
        if !self.kind.split_device {
            return program.to_vec();
        }
        let mut out = Vec::with_capacity(program.len());
        for token in program {
            if let Some(device) = device_of(token) {
                out.push(device);
            }
            out.push(token.clone());
        }
        out
    }

    fn classify<'a>(&'a self, token: &'a str) -> &'a str {
        if let Some(class) = self.token_classes.get(token) {
            return class;
        }
        self.prefix_classes
            .iter()
            .find(|(prefix, _)| token.starts_with(prefix.as_str()))
            .map(|(_, class)| class.as_str())
            .unwrap_or(token)
    }

    /// Map program tokens to (terminal id, token) pairs.
    pub fn tokenize(&self, program: &[String]) -> Result<Vec<(usize, String)>, GrammarError> {
        self.preprocess(program)
            .into_iter()
            .map(|token| {
                let symbol = self.classify(&token);
                match self.parser.terminal_id(symbol) {
                    Some(id) => Ok((id, token.clone())),
                    None => Err(GrammarError::UnknownToken(token.clone())),
                }
            })
            .collect()
    }

    /// Rule ids of a program in the grammar's direction,
    /// truncated to `max_length`.
    pub fn vectorize(&self, program: &[String], max_length: usize) -> Result<Vec<usize>, GrammarError> {
        let tokens = self.tokenize(program)?;
        let mut rules = match self.kind.direction {
            Direction::BottomUp => self
                .parser
                .parse(tokens)?
                .into_iter()
                .filter_map(|step| match step {
                    ParseStep::Reduce(rule_id) => Some(rule_id),
                    ParseStep::Shift { .. } => None,
                })
                .collect(),
            Direction::TopDown => self.parser.parse_reverse(tokens)?,
        };
        rules.truncate(max_length);
        Ok(rules)
    }

    /// Two programs are equivalent when their tokens are equal.
    pub fn compare(&self, gold: &[String], decoded: &[String]) -> bool {
        gold == decoded
    }
}

/// "@com.xkcd.get_comic" → "@@com.xkcd"
fn device_of(token: &str) -> Option<String> {
    if token.starts_with("@@") {
        return None;
    }
    let function = token.strip_prefix('@')?;
    let (device, _) = function.rsplit_once('.')?;
    Some(format!("@@{device}"))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const TEST_GRAMMAR: &str = r#"{
        "start": "$prog",
        "rules": {
            "$prog":    [["$command"], ["$rule"]],
            "$rule":    [["$stream", "$action"], ["$stream", "notify"]],
            "$command": [["$table", "notify"], ["$table", "$action"]],
            "$table":   [["$get"], ["$table", "filter", "$filter"]],
            "$stream":  [["monitor", "$table"]],
            "$get":     [["$get", "$ip"], ["GET"]],
            "$action":  [["$action", "$ip"], ["DO"]],
            "$ip":      [["PARAM", "$number"], ["PARAM", "$string"]],
            "$number":  [["num0"], ["num1"]],
            "$string":  [["qs0"], ["qs1"]],
            "$filter":  [["PARAM", "==", "$number"], ["PARAM", ">", "$number"],
                         ["PARAM", "<", "$number"], ["PARAM", "==", "$string"],
                         ["PARAM", "=~", "$string"]]
        },
        "terminal_classes": {
            "GET": ["@xkcd.get_comic", "@thermostat.get_temp", "@twitter.search"],
            "DO":  ["@twitter.post"]
        },
        "prefix_classes": { "PARAM": "param:" }
    }"#;

    pub(crate) fn test_grammar(kind: &str) -> ProgramGrammar {
        let file: GrammarFile = serde_json::from_str(TEST_GRAMMAR).unwrap();
        ProgramGrammar::from_file(&file, kind.parse().unwrap()).unwrap()
    }

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_rule_ids_follow_file_order() {
        let grammar = test_grammar("bottomup");
        assert_eq!(grammar.rule_to_string(0), "$prog -> $command");
        assert_eq!(grammar.rule_to_string(2), "$rule -> $stream $action");
        assert_eq!(grammar.num_rules(), 24);
    }

    #[test]
    fn test_grammar_kind_names() {
        let kind: GrammarKind = "reverse-tt-split-device".parse().unwrap();
        assert_eq!(kind, GrammarKind { direction: Direction::TopDown, split_device: true });
        let kind: GrammarKind = "new-tt".parse().unwrap();
        assert_eq!(kind.direction, Direction::BottomUp);
        assert!("lr(1)".parse::<GrammarKind>().is_err());
    }

    #[test]
    fn test_other_languages_are_rejected() {
        for name in ["simple", "django-BU", "django-TD"] {
            let err = name.parse::<GrammarKind>().unwrap_err();
            assert!(matches!(err, GrammarError::UnknownGrammarType(ref n) if n == name));
        }
    }

    #[test]
    fn test_tokenize_uses_classes() {
        let grammar = test_grammar("bottomup");
        let tokens  = grammar.tokenize(&words("@twitter.search param:text notify")).unwrap();
        let symbols: Vec<&str> = tokens
            .iter()
            .map(|(id, _)| grammar.parser.terminals()[*id].as_str())
            .collect();
        assert_eq!(symbols, vec!["GET", "PARAM", "notify"]);
        assert_eq!(tokens[1].1, "param:text");
    }

    #[test]
    fn test_unknown_token() {
        let grammar = test_grammar("bottomup");
        let err = grammar.tokenize(&words("@xkcd.get_comic whatever")).unwrap_err();
        assert_eq!(err, GrammarError::UnknownToken("whatever".into()));
    }

    #[test]
    fn test_vectorize_directions_agree_on_length() {
        let program = words("monitor @thermostat.get_temp @twitter.post param:text qs0");
        let bottom_up = test_grammar("bottomup").vectorize(&program, 60).unwrap();
        let top_down  = test_grammar("topdown").vectorize(&program, 60).unwrap();
        assert_eq!(bottom_up.len(), 9);
        assert_eq!(top_down.len(), 9);
        assert_eq!(top_down[0], 1); // $prog -> $rule
        assert_eq!(*bottom_up.last().unwrap(), 1);
    }

    #[test]
    fn test_vectorize_truncates() {
        let program = words("monitor @thermostat.get_temp @twitter.post param:text qs0");
        assert_eq!(test_grammar("bottomup").vectorize(&program, 4).unwrap().len(), 4);
    }

    #[test]
    fn test_split_device_inserts_device_tokens() {
        let grammar = test_grammar("tt-split-device");
        let out = grammar.preprocess(&words("monitor @com.xkcd.get_comic notify"));
        assert_eq!(out, words("monitor @@com.xkcd @com.xkcd.get_comic notify"));
    }

    #[test]
    fn test_device_of() {
        assert_eq!(device_of("@org.thingpedia.weather.current"), Some("@@org.thingpedia.weather".into()));
        assert_eq!(device_of("@@org.thingpedia.weather"), None);
        assert_eq!(device_of("notify"), None);
        assert_eq!(device_of("@nodot"), None);
    }
}
