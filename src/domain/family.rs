// ============================================================
// Layer 3 — Problem / Model Families
// ============================================================
// Dataset definitions ("problems") and model definitions are
// split into two groups by name:
//
//   LUI family  → semantic_parsing_*  problems
//                 luinet_*            models
//   stock       → everything else that ships with Tensor2Tensor
//
// A LUI problem only produces the inputs a LUI model expects
// (grammar-encoded programs, copy annotations) and vice versa,
// so a run mixing the two groups is rejected before anything
// is launched.

use crate::domain::error::WrapperError;

pub const DEFAULT_PROBLEM_PREFIX: &str = "semantic_parsing";
pub const DEFAULT_MODEL_PREFIX: &str = "luinet";

/// Naming convention used to decide family membership
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyRule {
    pub problem_prefix: String,
    pub model_prefix:   String,
}

impl Default for FamilyRule {
    fn default() -> Self {
        Self {
            problem_prefix: DEFAULT_PROBLEM_PREFIX.to_string(),
            model_prefix:   DEFAULT_MODEL_PREFIX.to_string(),
        }
    }
}

impl FamilyRule {
    pub fn new(problem_prefix: impl Into<String>, model_prefix: impl Into<String>) -> Self {
        Self {
            problem_prefix: problem_prefix.into(),
            model_prefix:   model_prefix.into(),
        }
    }

    pub fn is_lui_problem(&self, problem: &str) -> bool {
        problem.starts_with(&self.problem_prefix)
    }

    pub fn is_lui_model(&self, model: &str) -> bool {
        model.starts_with(&self.model_prefix)
    }

    /// Both flags must agree on the family.
    pub fn check(&self, problem: &str, model: &str) -> Result<(), WrapperError> {
        let problem_is_lui = self.is_lui_problem(problem);
        let model_is_lui   = self.is_lui_model(model);

        if problem_is_lui != model_is_lui {
            return Err(WrapperError::FamilyMismatch {
                problem: problem.to_string(),
                model: model.to_string(),
                problem_is_lui,
                model_is_lui,
            });
        }
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_lui_is_consistent() {
        let rule = FamilyRule::default();
        assert!(rule.check("semantic_parsing_for_thingtalk", "luinet_copy_transformer").is_ok());
    }

    #[test]
    fn test_both_stock_is_consistent() {
        let rule = FamilyRule::default();
        assert!(rule.check("translate_ende_wmt32k", "transformer").is_ok());
    }

    #[test]
    fn test_lui_problem_with_stock_model_fails() {
        let rule = FamilyRule::default();
        let err  = rule.check("semantic_parsing_for_thingtalk", "transformer").unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(matches!(
            err,
            WrapperError::FamilyMismatch { problem_is_lui: true, model_is_lui: false, .. }
        ));
    }

    #[test]
    fn test_stock_problem_with_lui_model_fails() {
        let rule = FamilyRule::default();
        assert!(rule.check("translate_ende_wmt32k", "luinet_copy_seq2seq").is_err());
    }

    #[test]
    fn test_custom_prefixes() {
        let rule = FamilyRule::new("genie_", "genie_");
        assert!(rule.check("genie_problem", "genie_model").is_ok());
        assert!(rule.check("genie_problem", "luinet_copy_seq2seq").is_err());
    }
}
