// Errors raised while compiling a grammar or parsing a program.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GrammarError {
    #[error("start symbol '{0}' has no rules")]
    UnknownStartSymbol(String),

    #[error("non-terminal {symbol} does not exist, in rule {lhs} -> {rhs}")]
    UndefinedNonTerminal { symbol: String, lhs: String, rhs: String },

    #[error("rule {lhs} -> (empty) is not allowed in an SLR grammar")]
    EmptyRule { lhs: String },

    #[error("duplicate rule {lhs} -> {rhs}")]
    DuplicateRule { lhs: String, rhs: String },

    #[error("terminal '{0}' sorts before the reserved tokens")]
    ReservedTerminal(String),

    #[error("ambiguous transition from state {state} through {symbol}")]
    AmbiguousTransition { state: usize, symbol: String },

    #[error("conflict for state {state} terminal {terminal}: want reduce {rule}, have {existing}")]
    Conflict { state: usize, terminal: String, rule: usize, existing: String },

    #[error("parse error: unexpected token {unexpected} in state {state}, expected {expected:?}")]
    Parse { unexpected: String, state: usize, expected: Vec<String> },

    #[error("token '{0}' is not a terminal of the grammar")]
    UnknownToken(String),

    #[error("invalid action sequence")]
    InvalidSequence,

    #[error("unknown grammar type '{0}'")]
    UnknownGrammarType(String),
}
