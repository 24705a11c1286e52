//! Configuration builders controlling training and corpus ingestion.

use std::collections::HashSet;

use crate::error::{BpeError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for BPE training, fixed for the lifetime of one training run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainerConfig {
    /// Upper bound on the vocabulary size, special tokens and the end-of-word marker included.
    pub vocab_size: usize,
    /// Reserved tokens assigned the lowest ids, in this order.
    pub special_tokens: Vec<String>,
    /// Special token whose id stands in for out-of-vocabulary symbols.
    pub unknown_token: String,
    /// Padding token. Reserved for callers; the core never emits it.
    pub pad_token: String,
    /// Minimum aggregated pair count required to accept a merge.
    pub min_frequency: usize,
    /// Hard cap on merge iterations.
    pub max_merges: usize,
    /// Symbol appended to every word so merges never cross word boundaries.
    pub end_of_word: String,
    /// Enables per-iteration logging through the `log` facade.
    pub show_progress: bool,
}

impl TrainerConfig {
    /// Returns a builder initialised with [`TrainerConfig::default`].
    #[must_use]
    pub fn builder() -> TrainerBuilder {
        TrainerBuilder::default()
    }

    /// Validates the invariants required for training.
    pub fn validate(&self) -> Result<()> {
        if self.min_frequency == 0 {
            return Err(BpeError::InvalidConfig(
                "min_frequency must be greater than zero".into(),
            ));
        }
        if self.end_of_word.is_empty() {
            return Err(BpeError::InvalidConfig(
                "end_of_word marker must not be empty".into(),
            ));
        }
        let mut seen = HashSet::with_capacity(self.special_tokens.len());
        for token in &self.special_tokens {
            if token.is_empty() {
                return Err(BpeError::InvalidConfig(
                    "special tokens must not be empty".into(),
                ));
            }
            if !seen.insert(token.as_str()) {
                return Err(BpeError::InvalidConfig(format!(
                    "special token {token:?} is listed more than once"
                )));
            }
        }
        if !seen.contains(self.unknown_token.as_str()) {
            return Err(BpeError::InvalidConfig(format!(
                "unknown_token {:?} must be one of the special tokens",
                self.unknown_token
            )));
        }
        if seen.contains(self.end_of_word.as_str()) {
            return Err(BpeError::InvalidConfig(format!(
                "end_of_word marker {:?} collides with a special token",
                self.end_of_word
            )));
        }
        if self.vocab_size < self.special_tokens.len() + 1 {
            return Err(BpeError::InvalidConfig(format!(
                "vocab_size ({}) must leave room for {} special tokens and the end-of-word marker",
                self.vocab_size,
                self.special_tokens.len()
            )));
        }
        Ok(())
    }

    /// Returns `true` when `token` is one of the configured special tokens.
    #[must_use]
    pub fn is_special(&self, token: &str) -> bool {
        self.special_tokens.iter().any(|special| special == token)
    }

    /// Merges every field present in `patch` over this configuration.
    pub fn apply_patch(&mut self, patch: &ConfigPatch) {
        if let Some(value) = patch.vocab_size {
            self.vocab_size = value;
        }
        if let Some(tokens) = &patch.special_tokens {
            self.special_tokens = tokens.clone();
        }
        if let Some(token) = &patch.unknown_token {
            self.unknown_token = token.clone();
        }
        if let Some(token) = &patch.pad_token {
            self.pad_token = token.clone();
        }
        if let Some(value) = patch.min_frequency {
            self.min_frequency = value;
        }
        if let Some(value) = patch.max_merges {
            self.max_merges = value;
        }
        if let Some(marker) = &patch.end_of_word {
            self.end_of_word = marker.clone();
        }
        if let Some(enabled) = patch.show_progress {
            self.show_progress = enabled;
        }
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            vocab_size: 1000,
            special_tokens: vec![
                "<pad>".into(),
                "<unk>".into(),
                "<bos>".into(),
                "<eos>".into(),
            ],
            unknown_token: "<unk>".into(),
            pad_token: "<pad>".into(),
            min_frequency: 2,
            max_merges: 500,
            end_of_word: "</w>".into(),
            show_progress: false,
        }
    }
}

/// Partial configuration where every field is optional.
///
/// Vocabulary snapshots carry their configuration in this shape so that an
/// import only overrides the fields it actually contains.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigPatch {
    /// Overrides [`TrainerConfig::vocab_size`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocab_size: Option<usize>,
    /// Overrides [`TrainerConfig::special_tokens`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_tokens: Option<Vec<String>>,
    /// Overrides [`TrainerConfig::unknown_token`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_token: Option<String>,
    /// Overrides [`TrainerConfig::pad_token`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pad_token: Option<String>,
    /// Overrides [`TrainerConfig::min_frequency`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_frequency: Option<usize>,
    /// Overrides [`TrainerConfig::max_merges`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_merges: Option<usize>,
    /// Overrides [`TrainerConfig::end_of_word`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_of_word: Option<String>,
    /// Overrides [`TrainerConfig::show_progress`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_progress: Option<bool>,
}

impl From<&TrainerConfig> for ConfigPatch {
    fn from(cfg: &TrainerConfig) -> Self {
        Self {
            vocab_size: Some(cfg.vocab_size),
            special_tokens: Some(cfg.special_tokens.clone()),
            unknown_token: Some(cfg.unknown_token.clone()),
            pad_token: Some(cfg.pad_token.clone()),
            min_frequency: Some(cfg.min_frequency),
            max_merges: Some(cfg.max_merges),
            end_of_word: Some(cfg.end_of_word.clone()),
            show_progress: Some(cfg.show_progress),
        }
    }
}

/// Builder for [`TrainerConfig`].
#[derive(Debug, Default, Clone)]
pub struct TrainerBuilder {
    cfg: TrainerConfig,
}

impl TrainerBuilder {
    /// Creates a builder with [`TrainerConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the vocabulary size cap.
    #[must_use]
    pub fn vocab_size(mut self, value: usize) -> Self {
        self.cfg.vocab_size = value;
        self
    }

    /// Sets the minimum merge frequency.
    #[must_use]
    pub fn min_frequency(mut self, value: usize) -> Self {
        self.cfg.min_frequency = value;
        self
    }

    /// Sets the merge iteration cap.
    #[must_use]
    pub fn max_merges(mut self, value: usize) -> Self {
        self.cfg.max_merges = value;
        self
    }

    /// Overrides the ordered list of special tokens.
    #[must_use]
    pub fn special_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cfg.special_tokens = tokens.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Selects which special token represents unknown symbols.
    #[must_use]
    pub fn unknown_token(mut self, token: impl Into<String>) -> Self {
        self.cfg.unknown_token = token.into();
        self
    }

    /// Sets the padding token.
    #[must_use]
    pub fn pad_token(mut self, token: impl Into<String>) -> Self {
        self.cfg.pad_token = token.into();
        self
    }

    /// Overrides the end-of-word marker.
    #[must_use]
    pub fn end_of_word(mut self, marker: impl Into<String>) -> Self {
        self.cfg.end_of_word = marker.into();
        self
    }

    /// Enables or disables per-iteration logging.
    #[must_use]
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.cfg.show_progress = enabled;
        self
    }

    /// Finalises the builder, returning a validated [`TrainerConfig`].
    pub fn build(self) -> Result<TrainerConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

/// Configuration controlling how text corpora are discovered on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestConfig {
    /// Enables recursive directory traversal.
    pub recursive: bool,
    /// Follows symlinks encountered during traversal.
    pub follow_symlinks: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            follow_symlinks: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = TrainerConfig::default();
        cfg.validate().expect("default config should be valid");
        assert_eq!(cfg.vocab_size, 1000);
        assert_eq!(cfg.min_frequency, 2);
        assert_eq!(cfg.max_merges, 500);
        assert!(cfg.is_special("<unk>"));
        assert!(!cfg.is_special("</w>"));
    }

    #[test]
    fn validate_rejects_unknown_token_outside_specials() {
        let err = TrainerConfig::builder()
            .special_tokens(["<pad>"])
            .unknown_token("<unk>")
            .build()
            .expect_err("validation should fail");
        assert!(matches!(
            err,
            BpeError::InvalidConfig(message) if message.contains("unknown_token")
        ));
    }

    #[test]
    fn validate_rejects_duplicate_specials_and_marker_collision() {
        let duplicate = TrainerConfig::builder()
            .special_tokens(["<unk>", "<unk>"])
            .build();
        assert!(matches!(duplicate, Err(BpeError::InvalidConfig(_))));

        let collision = TrainerConfig::builder()
            .special_tokens(["<unk>", "</w>"])
            .build();
        assert!(matches!(
            collision,
            Err(BpeError::InvalidConfig(message)) if message.contains("collides")
        ));
    }

    #[test]
    fn validate_rejects_tiny_vocab() {
        let err = TrainerConfig::builder().vocab_size(4).build();
        assert!(matches!(err, Err(BpeError::InvalidConfig(_))));
        TrainerConfig::builder()
            .vocab_size(5)
            .build()
            .expect("room for marker");
    }

    #[test]
    fn patch_overrides_only_present_fields() {
        let mut cfg = TrainerConfig::default();
        let patch = ConfigPatch {
            vocab_size: Some(64),
            min_frequency: Some(3),
            ..ConfigPatch::default()
        };
        cfg.apply_patch(&patch);
        assert_eq!(cfg.vocab_size, 64);
        assert_eq!(cfg.min_frequency, 3);
        assert_eq!(cfg.max_merges, 500);
        assert_eq!(cfg.unknown_token, "<unk>");
    }

    #[test]
    fn full_patch_reproduces_config() {
        let cfg = TrainerConfig::builder()
            .vocab_size(42)
            .max_merges(7)
            .build()
            .expect("valid");
        let mut other = TrainerConfig::default();
        other.apply_patch(&ConfigPatch::from(&cfg));
        assert_eq!(other, cfg);
    }
}
