// ============================================================
// Layer 4 — Test Shard Relocation
// ============================================================
// Tensor2Tensor only evaluates on the "dev" split of a data
// directory. To evaluate on the test split instead, the test
// shard is moved into a fresh sub-directory under a dev name:
//
//   data/
//     semantic_parsing-train-00000-of-00001
//     semantic_parsing-dev-00000-of-00001
//     semantic_parsing-test-00000-of-00001     ─┐
//     test_data/                                │ moved + renamed
//       semantic_parsing-dev-00000-of-00001   ◄─┘
//
// and the trainer is pointed at data/test_data.
//
// Exactly one file may match "<problem>-test*". Zero matches
// (nothing to evaluate) and several matches (ambiguous) are
// both fatal. A failing rename is ignored: a shard left over
// from a previous evaluation is already in place.

use anyhow::{Context, Result};
use globset::Glob;
use std::{fs, path::{Path, PathBuf}};

use crate::domain::error::WrapperError;

/// Sub-directory the relocated shard lives in
pub const TEST_DATA_DIR: &str = "test_data";

/// File name pattern of a problem's test shards
pub fn test_shard_pattern(problem: &str) -> String {
    format!("{problem}-test*")
}

/// "p-test-00000-of-00001" → "p-dev-00000-of-00001"
pub fn dev_name(file_name: &str) -> String {
    file_name.replacen("-test", "-dev", 1)
}

/// All regular files in `data_dir` matching the test shard pattern,
/// sorted by name.
pub fn find_test_shards(data_dir: &Path, problem: &str) -> Result<Vec<PathBuf>> {
    let pattern = test_shard_pattern(problem);
    let matcher = Glob::new(&pattern)
        .with_context(|| format!("Invalid shard pattern '{pattern}'"))?
        .compile_matcher();

    let mut shards = Vec::new();
    for entry in fs::read_dir(data_dir)
        .with_context(|| format!("Cannot read data directory '{}'", data_dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if matcher.is_match(entry.file_name()) {
            shards.push(entry.path());
        }
    }
    shards.sort();
    Ok(shards)
}

/// Move the single test shard to `<data_dir>/test_data` under its
/// dev name and return the directory the evaluator should read.
pub fn relocate_test_shard(data_dir: &Path, problem: &str) -> Result<PathBuf> {
    let shards = find_test_shards(data_dir, problem)?;
    if shards.len() != 1 {
        return Err(WrapperError::TestShardCount {
            pattern: data_dir.join(test_shard_pattern(problem)).display().to_string(),
            found:   shards.len(),
        }
        .into());
    }
    let shard = &shards[0];

    let test_dir = data_dir.join(TEST_DATA_DIR);
    fs::create_dir_all(&test_dir)
        .with_context(|| format!("Cannot create '{}'", test_dir.display()))?;

    let file_name = shard
        .file_name()
        .and_then(|n| n.to_str())
        .context("Test shard name is not valid UTF-8")?;
    let target = test_dir.join(dev_name(file_name));

    match fs::rename(shard, &target) {
        Ok(()) => tracing::info!("Moved '{}' to '{}'", shard.display(), target.display()),
        Err(e) => tracing::debug!("Ignoring failed rename of '{}': {}", shard.display(), e),
    }

    Ok(test_dir)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"records").unwrap();
    }

    #[test]
    fn test_dev_name_replaces_first_test_only() {
        assert_eq!(dev_name("p-test-00000-of-00001"), "p-dev-00000-of-00001");
        assert_eq!(dev_name("p-test-test"), "p-dev-test");
    }

    #[test]
    fn test_single_shard_is_moved() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "semantic_parsing-train-00000-of-00001");
        touch(dir.path(), "semantic_parsing-test-00000-of-00001");

        let new_dir = relocate_test_shard(dir.path(), "semantic_parsing").unwrap();

        assert_eq!(new_dir, dir.path().join("test_data"));
        assert!(new_dir.join("semantic_parsing-dev-00000-of-00001").is_file());
        assert!(!dir.path().join("semantic_parsing-test-00000-of-00001").exists());
        assert!(dir.path().join("semantic_parsing-train-00000-of-00001").exists());
    }

    #[test]
    fn test_failed_rename_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "semantic_parsing-test-00000-of-00001");
        // a non-empty directory at the target makes the rename fail
        let blocker = dir.path().join("test_data").join("semantic_parsing-dev-00000-of-00001");
        fs::create_dir_all(&blocker).unwrap();
        touch(&blocker, "keep");

        let new_dir = relocate_test_shard(dir.path(), "semantic_parsing").unwrap();

        assert_eq!(new_dir, dir.path().join("test_data"));
        assert!(dir.path().join("semantic_parsing-test-00000-of-00001").is_file());
        assert!(blocker.join("keep").is_file());
    }

    #[test]
    fn test_no_shard_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "semantic_parsing-train-00000-of-00001");

        let err = relocate_test_shard(dir.path(), "semantic_parsing").unwrap_err();
        let wrapped = err.downcast_ref::<WrapperError>().unwrap();
        assert!(matches!(wrapped, WrapperError::TestShardCount { found: 0, .. }));
        assert_eq!(wrapped.exit_code(), 1);
    }

    #[test]
    fn test_two_shards_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "semantic_parsing-test-00000-of-00002");
        touch(dir.path(), "semantic_parsing-test-00001-of-00002");

        let err = relocate_test_shard(dir.path(), "semantic_parsing").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WrapperError>(),
            Some(WrapperError::TestShardCount { found: 2, .. })
        ));
        // nothing was touched
        assert!(!dir.path().join("test_data").exists());
    }

    #[test]
    fn test_other_problems_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "semantic_parsing-test-00000-of-00001");
        touch(dir.path(), "translate_ende-test-00000-of-00001");

        let shards = find_test_shards(dir.path(), "semantic_parsing").unwrap();
        assert_eq!(shards.len(), 1);
    }
}
