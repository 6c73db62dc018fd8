// ============================================================
// Grammar Layer
// ============================================================
// Everything needed to turn a program (a list of tokens) into
// the sequence of grammar rules that produces it, and back.
//
//   slr.rs      — SLR(1) parser generator (grammar → tables)
//   parser.rs   — shift-reduce parser driven by those tables
//   program.rs  — grammar files, tokenisation, vectorisation
//   error.rs    — compile and parse errors
//
// Used by the scoring and statistics tools; the training
// wrappers never touch it.

pub mod error;
pub mod parser;
pub mod program;
pub mod slr;
