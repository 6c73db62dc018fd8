// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// One use case per subcommand. Each one sequences the other
// layers to accomplish its goal.
//
// Rules for this layer:
//   - No argument parsing or printing (that's Layer 1)
//   - No process spawning of its own: external programs are
//     described as Invocations and handed to a CommandRunner
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Trainer wrapper with perturb training
pub mod train_use_case;

// Evaluator wrapper with test-shard relocation
pub mod eval_use_case;

// End-to-end pipeline exercise
pub mod functional_test_use_case;

// Prediction scoring
pub mod score_use_case;

// Per-example statistics CSV
pub mod stats_use_case;

// Grammar rule usage counts
pub mod rule_distribution_use_case;
