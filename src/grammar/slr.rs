// ============================================================
// Grammar — SLR(1) Parser Generator
// ============================================================
// Compiles a context-free grammar into the action / goto
// tables of a shift-reduce parser.
//
// Pipeline (each step feeds the next):
//
//   raw rules
//       │  drop empty and unreachable non-terminals (fixpoint)
//       ▼
//   $ROOT -> start <EOF> appended, rules numbered in order
//       │
//       ▼
//   terminals / non-terminals sorted, ids assigned
//       │  PAD, EOF, START always get ids 0, 1, 2
//       ▼
//   FIRST and FOLLOW sets
//       │
//       ▼
//   LR(0) item sets, breadth first from the $ROOT closure
//       │
//       ▼
//   shift / goto / accept / reduce tables
//
// A reduce that collides with another action is a grammar
// error: the grammar is not SLR(1) and must be rewritten.
//
// Symbols starting with '$' are non-terminals, everything
// else is a terminal. Rules must not be empty.
//
// Reference: Aho, Sethi, Ullman — Compilers §4.7 (SLR tables)

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use crate::grammar::error::GrammarError;
use crate::grammar::parser::ShiftReduceParser;

// special tokens start with a space so they sort before
// every other terminal
pub const PAD_TOKEN: &str = " 0PAD";
pub const EOF_TOKEN: &str = " 1EOF";
pub const START_TOKEN: &str = " 2START";
pub const PAD_ID: usize = 0;
pub const EOF_ID: usize = 1;
pub const START_ID: usize = 2;

pub const ROOT_SYMBOL: &str = "$ROOT";

/// Ordered grammar: (lhs, alternatives), in definition order.
/// Rule ids follow this order.
pub type RuleSet = Vec<(String, Vec<Vec<String>>)>;

pub fn is_nonterminal(symbol: &str) -> bool {
    symbol.starts_with('$')
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub lhs: String,
    pub rhs: Vec<String>,
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.lhs, self.rhs.join(" "))
    }
}

/// One cell of the action table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Invalid,
    Accept,
    Shift(usize),
    Reduce(usize),
}

/// (rule id, dot position)
type Item = (usize, usize);

pub struct SlrParserGenerator {
    start_symbol:  String,
    rules:         Vec<Rule>,
    rules_by_lhs:  BTreeMap<String, Vec<usize>>,
    terminals:     Vec<String>,
    non_terminals: Vec<String>,
    symbol_ids:    HashMap<String, usize>,
    first_sets:    BTreeMap<String, BTreeSet<String>>,
    follow_sets:   BTreeMap<String, BTreeSet<String>>,
    item_sets:     Vec<Vec<Item>>,
    transitions:   Vec<BTreeMap<String, usize>>,
    action_table:  Vec<Vec<Action>>,
    goto_table:    Vec<Vec<Option<usize>>>,
    rule_table:    Vec<(usize, usize)>,
}

impl SlrParserGenerator {
    /// Compile `grammar` with `start_symbol` as its root.
    pub fn new(mut grammar: RuleSet, start_symbol: &str) -> Result<Self, GrammarError> {
        optimize_grammar(&mut grammar, start_symbol)?;
        grammar.push((
            ROOT_SYMBOL.to_string(),
            vec![vec![start_symbol.to_string(), EOF_TOKEN.to_string()]],
        ));

        let mut generator = Self {
            start_symbol:  start_symbol.to_string(),
            rules:         Vec::new(),
            rules_by_lhs:  BTreeMap::new(),
            terminals:     Vec::new(),
            non_terminals: Vec::new(),
            symbol_ids:    HashMap::new(),
            first_sets:    BTreeMap::new(),
            follow_sets:   BTreeMap::new(),
            item_sets:     Vec::new(),
            transitions:   Vec::new(),
            action_table:  Vec::new(),
            goto_table:    Vec::new(),
            rule_table:    Vec::new(),
        };

        generator.number_rules(grammar)?;
        generator.extract_terminals_non_terminals()?;
        generator.build_first_sets();
        generator.build_follow_sets();
        generator.generate_all_item_sets()?;
        generator.build_parse_tables()?;

        generator.check_first_sets();
        generator.check_follow_sets();

        tracing::debug!(
            "SLR tables: {} rules, {} terminals, {} non-terminals, {} states",
            generator.rules.len(),
            generator.terminals.len(),
            generator.non_terminals.len(),
            generator.item_sets.len(),
        );
        Ok(generator)
    }

    /// Hand the tables to a parser.
    ///
    /// The last rule, $ROOT -> start <EOF>, only exists for the
    /// generator and is not part of the parser's rule list.
    pub fn build(mut self) -> ShiftReduceParser {
        self.rules.pop();
        let start_id = self.symbol_ids[&self.start_symbol];
        ShiftReduceParser::new(
            self.rules,
            self.rule_table,
            self.action_table,
            self.goto_table,
            self.terminals,
            self.symbol_ids,
            start_id,
        )
    }

    pub fn num_states(&self) -> usize {
        self.item_sets.len()
    }

    pub fn terminals(&self) -> &[String] {
        &self.terminals
    }

    pub fn first_set(&self, non_terminal: &str) -> Option<&BTreeSet<String>> {
        self.first_sets.get(non_terminal)
    }

    pub fn follow_set(&self, non_terminal: &str) -> Option<&BTreeSet<String>> {
        self.follow_sets.get(non_terminal)
    }

    // ── Rule numbering ───────────────────────────────────────────────────────

    fn number_rules(&mut self, grammar: RuleSet) -> Result<(), GrammarError> {
        let mut seen = HashSet::new();
        for (lhs, alternatives) in grammar {
            let ids = self.rules_by_lhs.entry(lhs.clone()).or_default();
            for rhs in alternatives {
                if rhs.is_empty() {
                    return Err(GrammarError::EmptyRule { lhs });
                }
                if !seen.insert((lhs.clone(), rhs.clone())) {
                    return Err(GrammarError::DuplicateRule { lhs, rhs: rhs.join(" ") });
                }
                let rule_id = self.rules.len();
                tracing::trace!("{} {} -> {:?}", rule_id, lhs, rhs);
                ids.push(rule_id);
                self.rules.push(Rule { lhs: lhs.clone(), rhs });
            }
        }
        Ok(())
    }

    fn extract_terminals_non_terminals(&mut self) -> Result<(), GrammarError> {
        let mut terminals: BTreeSet<String> =
            [PAD_TOKEN, EOF_TOKEN, START_TOKEN].iter().map(|t| t.to_string()).collect();
        let mut non_terminals = BTreeSet::new();

        for rule in &self.rules {
            non_terminals.insert(rule.lhs.clone());
            for symbol in &rule.rhs {
                if is_nonterminal(symbol) {
                    non_terminals.insert(symbol.clone());
                } else {
                    terminals.insert(symbol.clone());
                }
            }
        }

        self.terminals     = terminals.into_iter().collect();
        self.non_terminals = non_terminals.into_iter().collect();

        for (id, reserved) in [(PAD_ID, PAD_TOKEN), (EOF_ID, EOF_TOKEN), (START_ID, START_TOKEN)] {
            if self.terminals[id] != reserved {
                return Err(GrammarError::ReservedTerminal(self.terminals[id].clone()));
            }
        }

        self.symbol_ids = self
            .terminals
            .iter()
            .chain(self.non_terminals.iter())
            .enumerate()
            .map(|(id, symbol)| (symbol.clone(), id))
            .collect();
        Ok(())
    }

    // ── FIRST / FOLLOW ───────────────────────────────────────────────────────

    fn build_first_sets(&mut self) {
        let mut first_sets: BTreeMap<String, BTreeSet<String>> = self
            .non_terminals
            .iter()
            .map(|nt| (nt.clone(), BTreeSet::new()))
            .collect();

        // no epsilon rules, so FIRST(A) is the union of FIRST of
        // the first symbol of each alternative
        let mut progress = true;
        while progress {
            progress = false;
            for (lhs, rule_ids) in &self.rules_by_lhs {
                let mut union = BTreeSet::new();
                for &rule_id in rule_ids {
                    let head = &self.rules[rule_id].rhs[0];
                    if is_nonterminal(head) {
                        if let Some(set) = first_sets.get(head) {
                            union.extend(set.iter().cloned());
                        }
                    } else {
                        union.insert(head.clone());
                    }
                }
                if first_sets.get(lhs) != Some(&union) {
                    first_sets.insert(lhs.clone(), union);
                    progress = true;
                }
            }
        }
        self.first_sets = first_sets;
    }

    fn build_follow_sets(&mut self) {
        let mut follow_sets: BTreeMap<String, BTreeSet<String>> = self
            .non_terminals
            .iter()
            .map(|nt| (nt.clone(), BTreeSet::new()))
            .collect();

        let mut progress = true;
        while progress {
            progress = false;
            for rule in &self.rules {
                let rhs = &rule.rhs;
                for pair in rhs.windows(2) {
                    let (current, next) = (&pair[0], &pair[1]);
                    if !is_nonterminal(current) {
                        continue;
                    }
                    let additions: Vec<String> = if is_nonterminal(next) {
                        self.first_sets.get(next).map(|s| s.iter().cloned().collect()).unwrap_or_default()
                    } else {
                        vec![next.clone()]
                    };
                    let target = follow_sets.entry(current.clone()).or_default();
                    for symbol in additions {
                        progress |= target.insert(symbol);
                    }
                }

                let last = &rhs[rhs.len() - 1];
                if is_nonterminal(last) {
                    let inherited: Vec<String> =
                        follow_sets.get(&rule.lhs).map(|s| s.iter().cloned().collect()).unwrap_or_default();
                    let target = follow_sets.entry(last.clone()).or_default();
                    for symbol in inherited {
                        progress |= target.insert(symbol);
                    }
                }
            }
        }
        self.follow_sets = follow_sets;
    }

    fn check_first_sets(&self) {
        for (lhs, first_set) in &self.first_sets {
            if first_set.is_empty() {
                tracing::warn!("non-terminal {} cannot start with any terminal", lhs);
            }
        }
    }

    fn check_follow_sets(&self) {
        for (lhs, follow_set) in &self.follow_sets {
            if lhs != ROOT_SYMBOL && follow_set.is_empty() {
                tracing::warn!("non-terminal {} cannot be followed by any terminal", lhs);
            }
        }
    }

    // ── Item sets ────────────────────────────────────────────────────────────

    fn symbol_after_dot(&self, (rule_id, dot): Item) -> Option<&str> {
        self.rules[rule_id].rhs.get(dot).map(String::as_str)
    }

    fn make_item_set(&self, lhs: &str) -> Vec<Item> {
        self.rules_by_lhs
            .get(lhs)
            .map(|ids| ids.iter().map(|&id| (id, 0)).collect())
            .unwrap_or_default()
    }

    fn close(&self, items: Vec<Item>) -> Vec<Item> {
        let mut item_set: BTreeSet<Item> = items.iter().copied().collect();
        let mut stack = items;
        while let Some(item) = stack.pop() {
            if let Some(symbol) = self.symbol_after_dot(item) {
                if is_nonterminal(symbol) {
                    for new_item in self.make_item_set(symbol) {
                        if item_set.insert(new_item) {
                            stack.push(new_item);
                        }
                    }
                }
            }
        }
        item_set.into_iter().collect()
    }

    /// Symbols that can be shifted or reduced-into from this set,
    /// in item order, without duplicates. EOF is never advanced over.
    fn followers(&self, item_set: &[Item]) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for &item in item_set {
            if let Some(symbol) = self.symbol_after_dot(item) {
                if symbol != EOF_TOKEN && !out.iter().any(|s| s == symbol) {
                    out.push(symbol.to_string());
                }
            }
        }
        out
    }

    fn advance(&self, item_set: &[Item], token: &str) -> Vec<Item> {
        item_set
            .iter()
            .filter(|&&item| self.symbol_after_dot(item) == Some(token))
            .map(|&(rule_id, dot)| (rule_id, dot + 1))
            .collect()
    }

    fn generate_all_item_sets(&mut self) -> Result<(), GrammarError> {
        let initial = self.close(self.make_item_set(ROOT_SYMBOL));

        let mut ids: HashMap<Vec<Item>, usize> = HashMap::new();
        let mut item_sets = vec![initial.clone()];
        let mut transitions: Vec<BTreeMap<String, usize>> = vec![BTreeMap::new()];
        ids.insert(initial, 0);

        let mut queue = VecDeque::from([0usize]);
        while let Some(state) = queue.pop_front() {
            let current = item_sets[state].clone();
            for token in self.followers(&current) {
                let next_set = self.close(self.advance(&current, &token));
                let next_id = match ids.get(&next_set) {
                    Some(&id) => id,
                    None => {
                        let id = item_sets.len();
                        ids.insert(next_set.clone(), id);
                        item_sets.push(next_set);
                        transitions.push(BTreeMap::new());
                        queue.push_back(id);
                        id
                    }
                };
                if let Some(previous) = transitions[state].insert(token.clone(), next_id) {
                    if previous != next_id {
                        return Err(GrammarError::AmbiguousTransition { state, symbol: token });
                    }
                }
            }
        }

        self.item_sets   = item_sets;
        self.transitions = transitions;
        Ok(())
    }

    // ── Tables ───────────────────────────────────────────────────────────────

    fn build_parse_tables(&mut self) -> Result<(), GrammarError> {
        let n_states    = self.item_sets.len();
        let n_terminals = self.terminals.len();

        self.rule_table = self
            .rules
            .iter()
            .map(|rule| (self.symbol_ids[&rule.lhs] - n_terminals, rule.rhs.len()))
            .collect();

        self.goto_table = (0..n_states)
            .map(|state| {
                self.non_terminals
                    .iter()
                    .map(|nt| self.transitions[state].get(nt).copied())
                    .collect()
            })
            .collect();

        self.action_table = (0..n_states)
            .map(|state| {
                self.terminals
                    .iter()
                    .map(|term| match self.transitions[state].get(term) {
                        Some(&next) => Action::Shift(next),
                        None => Action::Invalid,
                    })
                    .collect()
            })
            .collect();

        for (state, item_set) in self.item_sets.iter().enumerate() {
            if item_set.iter().any(|&item| self.symbol_after_dot(item) == Some(EOF_TOKEN)) {
                self.action_table[state][EOF_ID] = Action::Accept;
            }
        }

        for (state, item_set) in self.item_sets.iter().enumerate() {
            for &(rule_id, dot) in item_set {
                let rule = &self.rules[rule_id];
                if dot != rule.rhs.len() {
                    continue;
                }
                let Some(follow) = self.follow_sets.get(&rule.lhs) else {
                    continue;
                };
                for (term_id, term) in self.terminals.iter().enumerate() {
                    if !follow.contains(term) {
                        continue;
                    }
                    let existing = self.action_table[state][term_id];
                    if existing != Action::Invalid && existing != Action::Reduce(rule_id) {
                        tracing::error!("conflict in item set {}", state);
                        for &(other_id, other_dot) in item_set {
                            tracing::error!("  {} {} (dot at {})", other_id, self.rules[other_id], other_dot);
                        }
                        return Err(GrammarError::Conflict {
                            state,
                            terminal: term.clone(),
                            rule: rule_id,
                            existing: format!("{existing:?}"),
                        });
                    }
                    self.action_table[state][term_id] = Action::Reduce(rule_id);
                }
            }
        }
        Ok(())
    }
}

// ─── Grammar Optimisation ─────────────────────────────────────────────────────

fn optimize_grammar(grammar: &mut RuleSet, start_symbol: &str) -> Result<(), GrammarError> {
    let mut pass = 0;
    loop {
        pass += 1;
        tracing::trace!("grammar optimisation pass {}", pass);
        let emptied   = remove_empty_nonterminals(grammar);
        let unreached = remove_unreachable_nonterminals(grammar, start_symbol)?;
        if !emptied && !unreached {
            return Ok(());
        }
    }
}

/// Delete non-terminals without alternatives, and every rule
/// mentioning them, until nothing changes.
fn remove_empty_nonterminals(grammar: &mut RuleSet) -> bool {
    let mut deleted: HashSet<String> = HashSet::new();
    let mut any_change = false;
    let mut progress   = true;

    while progress {
        progress = false;
        for (lhs, alternatives) in grammar.iter_mut() {
            if alternatives.is_empty() {
                if deleted.insert(lhs.clone()) {
                    tracing::debug!("non-terminal {} is empty, deleted", lhs);
                    progress   = true;
                    any_change = true;
                }
                continue;
            }
            let before = alternatives.len();
            alternatives.retain(|rhs| !rhs.iter().any(|symbol| deleted.contains(symbol)));
            if alternatives.len() != before {
                tracing::debug!("{} rule(s) of {} deleted", before - alternatives.len(), lhs);
                progress   = true;
                any_change = true;
            }
        }
    }

    grammar.retain(|(lhs, _)| !deleted.contains(lhs));
    any_change
}

fn remove_unreachable_nonterminals(grammar: &mut RuleSet, start_symbol: &str) -> Result<bool, GrammarError> {
    let index: HashMap<&str, &Vec<Vec<String>>> =
        grammar.iter().map(|(lhs, alts)| (lhs.as_str(), alts)).collect();

    if !index.contains_key(start_symbol) {
        return Err(GrammarError::UnknownStartSymbol(start_symbol.to_string()));
    }

    let mut visited: HashSet<String> = HashSet::new();
    let mut stack = vec![start_symbol.to_string()];
    while let Some(non_terminal) = stack.pop() {
        if !visited.insert(non_terminal.clone()) {
            continue;
        }
        for rhs in index[non_terminal.as_str()] {
            for symbol in rhs {
                if !is_nonterminal(symbol) || visited.contains(symbol) {
                    continue;
                }
                if !index.contains_key(symbol.as_str()) {
                    return Err(GrammarError::UndefinedNonTerminal {
                        symbol: symbol.clone(),
                        lhs:    non_terminal.clone(),
                        rhs:    rhs.join(" "),
                    });
                }
                stack.push(symbol.clone());
            }
        }
    }

    let before = grammar.len();
    grammar.retain(|(lhs, _)| {
        let keep = visited.contains(lhs);
        if !keep {
            tracing::debug!("non-terminal {} is not reachable, deleted", lhs);
        }
        keep
    });
    Ok(grammar.len() != before)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn rules(table: &[(&str, &[&[&str]])]) -> RuleSet {
        table.iter()
            .map(|(lhs, alts)| {
                (
                    lhs.to_string(),
                    alts.iter().map(|rhs| rhs.iter().map(|s| s.to_string()).collect()).collect(),
                )
            })
            .collect()
    }

    /// Nested brackets: context free, not regular
    pub(crate) fn parenthesis_grammar() -> RuleSet {
        rules(&[
            ("$S", &[&["(", "$V", ")"], &["[", "$V", "]"], &["(", "$S", ")"], &["[", "$S", "]"]]),
            ("$V", &[&["a"], &["b"]]),
        ])
    }

    #[test]
    fn test_reserved_terminals_come_first() {
        let generator = SlrParserGenerator::new(parenthesis_grammar(), "$S").unwrap();
        let terminals = generator.terminals();
        assert_eq!(terminals[PAD_ID], PAD_TOKEN);
        assert_eq!(terminals[EOF_ID], EOF_TOKEN);
        assert_eq!(terminals[START_ID], START_TOKEN);
        assert_eq!(&terminals[3..], &["(", ")", "[", "]", "a", "b"]);
    }

    #[test]
    fn test_first_and_follow_sets() {
        let generator = SlrParserGenerator::new(parenthesis_grammar(), "$S").unwrap();
        let first: Vec<&String> = generator.first_set("$S").unwrap().iter().collect();
        assert_eq!(first, vec!["(", "["]);

        let follow_s = generator.follow_set("$S").unwrap();
        assert!(follow_s.contains(EOF_TOKEN));
        assert!(follow_s.contains(")"));
        assert!(follow_s.contains("]"));

        let follow_v: Vec<&String> = generator.follow_set("$V").unwrap().iter().collect();
        assert_eq!(follow_v, vec![")", "]"]);
    }

    #[test]
    fn test_unreachable_and_empty_are_removed() {
        let grammar = rules(&[
            ("$S", &[&["x", "$A"], &["y", "$E"]]),
            ("$A", &[&["a"]]),
            ("$E", &[]),
            ("$Orphan", &[&["z"]]),
        ]);
        let parser = SlrParserGenerator::new(grammar, "$S").unwrap().build();
        // "$S -> y $E" went away with $E, "$Orphan -> z" is unreachable
        assert_eq!(parser.num_rules(), 2);
        assert!(parser.terminal_id("z").is_none());
        assert!(parser.terminal_id("y").is_none());
    }

    #[test]
    fn test_undefined_nonterminal_is_an_error() {
        let grammar = rules(&[("$S", &[&["x", "$Missing"]])]);
        let err = SlrParserGenerator::new(grammar, "$S").err().unwrap();
        assert!(matches!(err, GrammarError::UndefinedNonTerminal { ref symbol, .. } if symbol == "$Missing"));
    }

    #[test]
    fn test_unknown_start_symbol() {
        let err = SlrParserGenerator::new(parenthesis_grammar(), "$Nope").err().unwrap();
        assert_eq!(err, GrammarError::UnknownStartSymbol("$Nope".into()));
    }

    #[test]
    fn test_duplicate_rule_is_an_error() {
        let grammar = rules(&[("$S", &[&["x"], &["x"]])]);
        let err = SlrParserGenerator::new(grammar, "$S").err().unwrap();
        assert!(matches!(err, GrammarError::DuplicateRule { .. }));
    }

    #[test]
    fn test_reduce_reduce_conflict_is_detected() {
        // after "x" the parser cannot decide between $A and $B
        let grammar = rules(&[
            ("$S", &[&["$A", "y"], &["$B", "y"]]),
            ("$A", &[&["x"]]),
            ("$B", &[&["x"]]),
        ]);
        let err = SlrParserGenerator::new(grammar, "$S").err().unwrap();
        assert!(matches!(err, GrammarError::Conflict { ref terminal, .. } if terminal == "y"));
    }
}
