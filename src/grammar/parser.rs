// ============================================================
// Grammar — Shift-Reduce Parser
// ============================================================
// A bottom-up parser driven by the tables that
// SlrParserGenerator produces.
//
// Four conversions are supported:
//
//   parse               tokens        → shifts + reduces (bottom-up)
//   parse_reverse       tokens        → reduces only, pre-order (top-down)
//   reconstruct         bottom-up     → (terminal, token) list
//   reconstruct_reverse top-down      → terminal symbols
//
// The bottom-up form is what a decoder emits when it builds a
// program leaves-first; the top-down form is what it emits
// when it expands the tree root-first.

use std::collections::HashMap;

use crate::grammar::error::GrammarError;
use crate::grammar::slr::{is_nonterminal, Action, Rule, EOF_ID};

/// One parser action, as recorded by `parse`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseStep {
    /// Terminal id plus the concrete token that matched it
    Shift { terminal: usize, token: String },
    /// Rule id
    Reduce(usize),
}

pub struct ShiftReduceParser {
    rules:        Vec<Rule>,
    /// (lhs non-terminal index, rhs length) per rule
    rule_table:   Vec<(usize, usize)>,
    action_table: Vec<Vec<Action>>,
    goto_table:   Vec<Vec<Option<usize>>>,
    terminals:    Vec<String>,
    /// terminals first, then non-terminals
    symbol_ids:   HashMap<String, usize>,
    start_symbol: usize,
}

impl ShiftReduceParser {
    pub(crate) fn new(
        rules:        Vec<Rule>,
        rule_table:   Vec<(usize, usize)>,
        action_table: Vec<Vec<Action>>,
        goto_table:   Vec<Vec<Option<usize>>>,
        terminals:    Vec<String>,
        symbol_ids:   HashMap<String, usize>,
        start_symbol: usize,
    ) -> Self {
        Self { rules, rule_table, action_table, goto_table, terminals, symbol_ids, start_symbol }
    }

    pub fn num_rules(&self) -> usize {
        self.rules.len()
    }

    pub fn num_states(&self) -> usize {
        self.action_table.len()
    }

    pub fn rule(&self, rule_id: usize) -> Option<&Rule> {
        self.rules.get(rule_id)
    }

    pub fn terminals(&self) -> &[String] {
        &self.terminals
    }

    pub fn terminal_id(&self, symbol: &str) -> Option<usize> {
        self.symbol_ids.get(symbol).copied().filter(|&id| id < self.terminals.len())
    }

    fn action(&self, state: usize, terminal: usize) -> Action {
        self.action_table[state].get(terminal).copied().unwrap_or(Action::Invalid)
    }

    fn expected_terminals(&self, state: usize) -> Vec<String> {
        self.action_table[state]
            .iter()
            .enumerate()
            .filter(|(_, action)| **action != Action::Invalid)
            .map(|(id, _)| self.terminals[id].clone())
            .collect()
    }

    /// Parse a tokenised program into its bottom-up action sequence.
    pub fn parse<I>(&self, tokens: I) -> Result<Vec<ParseStep>, GrammarError>
    where
        I: IntoIterator<Item = (usize, String)>,
    {
        let mut tokens = tokens.into_iter();
        let mut stack  = vec![0usize];
        let mut state  = 0usize;
        let mut result = Vec::new();

        let (mut terminal, mut token) = tokens.next().unwrap_or((EOF_ID, String::new()));
        loop {
            match self.action(state, terminal) {
                Action::Invalid => {
                    return Err(GrammarError::Parse {
                        unexpected: self
                            .terminals
                            .get(terminal)
                            .cloned()
                            .unwrap_or_else(|| format!("#{terminal}")),
                        state,
                        expected: self.expected_terminals(state),
                    });
                }
                Action::Accept => return Ok(result),
                Action::Shift(next) => {
                    state = next;
                    result.push(ParseStep::Shift { terminal, token: std::mem::take(&mut token) });
                    stack.push(state);
                    (terminal, token) = tokens.next().unwrap_or((EOF_ID, String::new()));
                }
                Action::Reduce(rule_id) => {
                    result.push(ParseStep::Reduce(rule_id));
                    let (lhs, rhs_len) = self.rule_table[rule_id];
                    stack.truncate(stack.len().saturating_sub(rhs_len));
                    let top = *stack.last().ok_or(GrammarError::InvalidSequence)?;
                    state = self.goto_table[top][lhs].ok_or(GrammarError::InvalidSequence)?;
                    stack.push(state);
                }
            }
        }
    }

    /// Parse, then reorder the reductions top-down (pre-order).
    pub fn parse_reverse<I>(&self, tokens: I) -> Result<Vec<usize>, GrammarError>
    where
        I: IntoIterator<Item = (usize, String)>,
    {
        let bottom_up = self.parse(tokens)?;

        // for every reduction: size of its subtree (in reductions)
        // and the positions of its non-terminal children
        let mut lens:     Vec<usize>      = Vec::new();
        let mut children: Vec<Vec<usize>> = Vec::new();
        let mut reduces:  Vec<usize>      = Vec::new();

        for step in &bottom_up {
            let &ParseStep::Reduce(rule_id) = step else {
                continue;
            };
            let position = reduces.len();
            let mut current_child = position as isize - 1;
            let mut my_length     = 1;
            let mut my_children   = Vec::new();

            for symbol in self.rules[rule_id].rhs.iter().rev() {
                if !is_nonterminal(symbol) {
                    continue;
                }
                if current_child < 0 {
                    return Err(GrammarError::InvalidSequence);
                }
                let child = current_child as usize;
                my_children.push(child);
                my_length     += lens[child];
                current_child -= lens[child] as isize;
            }
            my_children.reverse();

            lens.push(my_length);
            children.push(my_children);
            reduces.push(rule_id);
        }

        let root = reduces.len().checked_sub(1).ok_or(GrammarError::InvalidSequence)?;
        let mut out   = Vec::with_capacity(reduces.len());
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            out.push(reduces[node]);
            stack.extend(children[node].iter().rev());
        }
        Ok(out)
    }

    /// Rebuild the terminal symbols of a top-down rule sequence.
    ///
    /// Only grammar symbols come back: a class terminal such as
    /// PARAM is returned as "PARAM", not as the original token.
    pub fn reconstruct_reverse(&self, sequence: &[usize]) -> Result<Vec<String>, GrammarError> {
        let mut output = Vec::new();
        self.expand(sequence, 0, &mut output)?;
        Ok(output)
    }

    /// Returns how many entries of `sequence` the subtree at `start_at` used.
    fn expand(&self, sequence: &[usize], start_at: usize, output: &mut Vec<String>) -> Result<usize, GrammarError> {
        let rule_id = *sequence.get(start_at).ok_or(GrammarError::InvalidSequence)?;
        let rule    = self.rules.get(rule_id).ok_or(GrammarError::InvalidSequence)?;

        let mut length = 1;
        for symbol in &rule.rhs {
            if is_nonterminal(symbol) {
                length += self.expand(sequence, start_at + length, output)?;
            } else {
                output.push(symbol.clone());
            }
        }
        Ok(length)
    }

    /// Rebuild the (terminal id, token) list from a bottom-up
    /// action sequence. Terminals that were never shifted with a
    /// concrete token (keywords produced by a decoder that only
    /// emits reductions) come back as `None`.
    pub fn reconstruct(&self, sequence: &[ParseStep]) -> Result<Vec<(usize, Option<String>)>, GrammarError> {
        let n_terminals = self.terminals.len();
        let mut stack: Vec<Vec<(usize, Option<String>)>> = Vec::new();
        let mut top_lhs: Option<usize> = None;
        let mut token_stacks: HashMap<usize, Vec<String>> = HashMap::new();

        for step in sequence {
            match step {
                ParseStep::Shift { terminal, token } => {
                    token_stacks.entry(*terminal).or_default().push(token.clone());
                }
                ParseStep::Reduce(rule_id) => {
                    let rule = self.rules.get(*rule_id).ok_or(GrammarError::InvalidSequence)?;
                    top_lhs = Some(self.rule_table[*rule_id].0);

                    if rule.rhs.len() == 1 {
                        let symbol = &rule.rhs[0];
                        // unary non-terminal to non-terminal: nothing moves
                        if is_nonterminal(symbol) {
                            continue;
                        }
                        let symbol_id = self.symbol_ids[symbol];
                        stack.push(vec![take_token(&mut token_stacks, symbol_id)]);
                    } else {
                        let mut new_prog = Vec::new();
                        for symbol in rule.rhs.iter().rev() {
                            if is_nonterminal(symbol) {
                                new_prog.extend(stack.pop().ok_or(GrammarError::InvalidSequence)?);
                            } else {
                                let symbol_id = self.symbol_ids[symbol];
                                new_prog.push(take_token(&mut token_stacks, symbol_id));
                            }
                        }
                        stack.push(new_prog);
                    }
                }
            }
        }

        match top_lhs {
            Some(lhs) if n_terminals + lhs == self.start_symbol && stack.len() == 1 => {}
            _ => return Err(GrammarError::InvalidSequence),
        }

        // the program was assembled back to front
        let mut program = stack.pop().ok_or(GrammarError::InvalidSequence)?;
        program.reverse();
        Ok(program)
    }
}

/// Pop the most recent concrete token shifted for `symbol_id`.
fn take_token(stacks: &mut HashMap<usize, Vec<String>>, symbol_id: usize) -> (usize, Option<String>) {
    let token = stacks.get_mut(&symbol_id).and_then(Vec::pop);
    if stacks.get(&symbol_id).is_some_and(Vec::is_empty) {
        stacks.remove(&symbol_id);
    }
    (symbol_id, token)
}
