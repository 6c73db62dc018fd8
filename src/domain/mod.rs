// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe what a training or evaluation
// run IS, independent of how the external framework is called.
//
// Rules for this layer:
//   - NO process spawning
//   - NO file I/O
//   - Only plain structs, enums, traits and pure functions
//
// Everything here can be unit tested without a Tensor2Tensor
// installation on the machine.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// One sentence/program pair of a dataset
pub mod example;

// Immutable record of the flags forwarded to the trainer
pub mod flags;

// LUI problem/model family naming convention
pub mod family;

// Errors that map to specific process exit codes
pub mod error;

// External program invocations and the runner abstraction
pub mod traits;

// Prediction-versus-gold comparison and the results file format
pub mod score;
