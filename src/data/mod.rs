// ============================================================
// Layer 4 — Data
// ============================================================
// Everything that reads datasets or rearranges data files.
//
//   dataset / predictions files
//       │
//       ▼
//   TsvLoader / load_predictions  → Example, Vec<token>
//
//   <data_dir>/<problem>-test-*
//       │  exactly one shard, moved and renamed
//       ▼
//   <data_dir>/test_data/<problem>-dev-*
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

/// Loads id/sentence/program TSV files and prediction files
pub mod loader;

/// Finds the single test shard and relocates it for evaluation
pub mod shard;
