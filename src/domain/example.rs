// ============================================================
// Layer 3 — Example Domain Type
// ============================================================
// One line of a semantic parsing dataset: a natural language
// sentence and the program it means, both already split into
// whitespace-separated tokens.
//
// Example:
//   sentence: "tweet my location"
//   program:  "now => @com.twitter.post param:status = LOCATION"
//
// Reference: Rust Book §5 (Structs and Methods)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    /// Dataset identifier, kept for traceability
    pub id: String,

    /// Input sentence tokens
    pub sentence: Vec<String>,

    /// Gold program tokens
    pub program: Vec<String>,
}

impl Example {
    /// Create an Example from raw whitespace-separated text.
    pub fn from_text(id: impl Into<String>, sentence: &str, program: &str) -> Self {
        Self {
            id:       id.into(),
            sentence: tokens(sentence),
            program:  tokens(program),
        }
    }
}

/// Whitespace tokenisation shared by datasets and predictions
pub fn tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(String::from).collect()
}
