// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the outside world on behalf of the
// use cases:
//
//   process.rs      — Starts external programs and waits for
//                     their exit code (the real CommandRunner)
//
//   averager.rs     — Checkpoint averaging between perturb
//                     training loops, via t2t-avg-all
//
//   model_config.rs — Layered JSON model configuration; names
//                     the grammar a model was trained with
//
//   metrics.rs      — Scoring result files and the per-example
//                     statistics CSV
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// External process execution
pub mod process;

/// Checkpoint averaging invocation
pub mod averager;

/// Model configuration files
pub mod model_config;

/// Result, metric and statistics writers
pub mod metrics;
