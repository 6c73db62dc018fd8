// ============================================================
// Layer 6 — Model Configuration
// ============================================================
// The model configuration describes which grammar a trained
// model speaks and how its programs are encoded. It is stored
// as JSON in four sections:
//
//   {
//     "model":    { "model_type": "seq2seq", ... },
//     "training": { "batch_size": 256, ... },
//     "input":    { "max_length": 65, ... },
//     "output":   { "grammar": "bottomup",
//                   "grammar_input_file": "./en/grammar.json", ... }
//   }
//
// Several files can be layered: the built-in defaults first,
// then every file in order, each overriding only the keys it
// names (objects are merged recursively). A missing file is
// skipped, so "default.json + <model_dir>/model.json" works
// whether or not either exists.
//
// Reference: serde_json documentation (Value, from_value)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fs, path::{Path, PathBuf}};

use crate::grammar::program::{GrammarKind, ProgramGrammar};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    pub model_type:               String,
    pub encoder_type:             String,
    pub encoder_hidden_size:      usize,
    pub decoder_hidden_size:      usize,
    /// Overrides both encoder and decoder sizes when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden_size:              Option<usize>,
    pub rnn_cell_type:            String,
    pub rnn_layers:               usize,
    pub apply_attention:          bool,
    pub attention_probability_fn: String,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            model_type:               "seq2seq".to_string(),
            encoder_type:             "birnn".to_string(),
            encoder_hidden_size:      125,
            decoder_hidden_size:      250,
            hidden_size:              None,
            rnn_cell_type:            "lstm".to_string(),
            rnn_layers:               1,
            apply_attention:          true,
            attention_probability_fn: "softmax".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSection {
    pub batch_size:          usize,
    pub n_epochs:            usize,
    pub learning_rate:       f64,
    pub learning_rate_decay: f64,
    pub dropout:             f64,
    pub gradient_clip:       f64,
    pub l2_regularization:   f64,
    pub optimizer:           String,
    pub shuffle_data:        bool,
    pub curriculum_schedule: f64,
    pub curriculum_max_prob: f64,
}

impl Default for TrainingSection {
    fn default() -> Self {
        Self {
            batch_size:          256,
            n_epochs:            25,
            learning_rate:       0.005,
            learning_rate_decay: 0.95,
            dropout:             0.5,
            gradient_clip:       1.0,
            l2_regularization:   0.0,
            optimizer:           "RMSProp".to_string(),
            shuffle_data:        true,
            curriculum_schedule: 0.05,
            curriculum_max_prob: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSection {
    pub input_words:      PathBuf,
    pub input_embeddings: PathBuf,
    pub input_embed_size: usize,
    pub max_length:       usize,
}

impl Default for InputSection {
    fn default() -> Self {
        Self {
            input_words:      PathBuf::from("./en/input_words.txt"),
            input_embeddings: PathBuf::from("./en/embeddings-300.txt"),
            input_embed_size: 300,
            max_length:       65,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub grammar:             String,
    pub grammar_input_file:  PathBuf,
    pub output_embed_size:   usize,
    pub beam_width:          usize,
    pub training_beam_width: usize,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            grammar:             "bottomup".to_string(),
            grammar_input_file:  PathBuf::from("./en/grammar.json"),
            output_embed_size:   100,
            beam_width:          10,
            training_beam_width: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model:    ModelSection,
    pub training: TrainingSection,
    pub input:    InputSection,
    pub output:   OutputSection,
}

impl ModelConfig {
    /// Layer `paths` over the defaults. Missing files are skipped.
    pub fn load(paths: &[PathBuf]) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;
        let mut read = 0;

        for path in paths {
            if !path.exists() {
                tracing::debug!("Skipping missing configuration '{}'", path.display());
                continue;
            }
            let json = fs::read_to_string(path)
                .with_context(|| format!("Cannot read configuration '{}'", path.display()))?;
            let layer: Value = serde_json::from_str(&json)
                .with_context(|| format!("Invalid JSON in '{}'", path.display()))?;
            merge(&mut merged, layer);
            read += 1;
        }

        if read == 0 {
            tracing::warn!("No configuration file found, using defaults");
        }

        let config: Self = serde_json::from_value(merged)
            .context("Configuration has the wrong shape")?;
        tracing::info!(
            "Model {} ({} layers, hidden {}/{}), beam size {}, grammar {}",
            config.model.model_type,
            config.model.rnn_layers,
            config.encoder_hidden_size(),
            config.decoder_hidden_size(),
            config.beam_size(),
            config.output.grammar,
        );
        Ok(config)
    }

    pub fn encoder_hidden_size(&self) -> usize {
        self.model.hidden_size.unwrap_or(self.model.encoder_hidden_size)
    }

    pub fn decoder_hidden_size(&self) -> usize {
        self.model.hidden_size.unwrap_or(self.model.decoder_hidden_size)
    }

    /// Only beam-search models decode with a beam wider than one.
    pub fn beam_size(&self) -> usize {
        match self.model.model_type.as_str() {
            "beamsearch" | "beamdecode" => self.output.beam_width,
            _ => 1,
        }
    }

    pub fn grammar_kind(&self) -> Result<GrammarKind> {
        Ok(self.output.grammar.parse()?)
    }

    /// Load and compile the configured grammar file.
    pub fn load_grammar(&self) -> Result<ProgramGrammar> {
        ProgramGrammar::load(&self.output.grammar_input_file, self.grammar_kind()?)
    }

    /// `default.json` in the working directory, then `<model_dir>/model.json`
    pub fn model_dir_layers(model_dir: &Path) -> Vec<PathBuf> {
        vec![PathBuf::from("default.json"), model_dir.join("model.json")]
    }
}

/// Recursively merge `overlay` into `base`; non-object values replace.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::program::Direction;

    #[test]
    fn test_defaults_without_files() {
        let config = ModelConfig::load(&[PathBuf::from("/nonexistent/model.json")]).unwrap();
        assert_eq!(config, ModelConfig::default());
        assert_eq!(config.input.max_length, 65);
        assert_eq!(config.beam_size(), 1);
    }

    #[test]
    fn test_layers_override_in_order() {
        let dir    = tempfile::tempdir().unwrap();
        let first  = dir.path().join("default.json");
        let second = dir.path().join("model.json");
        fs::write(&first, r#"{"model": {"model_type": "beamsearch", "rnn_layers": 2}}"#).unwrap();
        fs::write(&second, r#"{"model": {"rnn_layers": 3}, "output": {"beam_width": 5}}"#).unwrap();

        let config = ModelConfig::load(&[first, second]).unwrap();

        // untouched keys in an overridden section keep their value
        assert_eq!(config.model.model_type, "beamsearch");
        assert_eq!(config.model.rnn_layers, 3);
        assert_eq!(config.model.encoder_type, "birnn");
        assert_eq!(config.beam_size(), 5);
    }

    #[test]
    fn test_hidden_size_overrides_both() {
        let mut config = ModelConfig::default();
        assert_eq!((config.encoder_hidden_size(), config.decoder_hidden_size()), (125, 250));
        config.model.hidden_size = Some(64);
        assert_eq!((config.encoder_hidden_size(), config.decoder_hidden_size()), (64, 64));
    }

    #[test]
    fn test_grammar_kind() {
        let mut config = ModelConfig::default();
        config.output.grammar = "reverse-tt-split-device".to_string();
        let kind = config.grammar_kind().unwrap();
        assert_eq!(kind.direction, Direction::TopDown);
        assert!(kind.split_device);

        config.output.grammar = "lstm".to_string();
        assert!(config.grammar_kind().is_err());
    }

    #[test]
    fn test_bad_json_is_reported() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(ModelConfig::load(&[path]).is_err());
    }
}
