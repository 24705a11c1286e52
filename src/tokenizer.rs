//! Stateful tokenizer façade owning configuration, trained model and statistics.

use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use log::{debug, warn};

use crate::benchmark::{run_benchmark, BenchmarkReport};
use crate::config::TrainerConfig;
use crate::error::{BpeError, Result};
use crate::metrics::{EncodeMetrics, TrainingMetrics};
use crate::model::BpeModel;
use crate::serialization::{load_snapshot, save_snapshot, VocabularySnapshot};
use crate::trainer::Trainer;
use crate::validation::{validate_round_trip, RoundTripReport};
use crate::vocab::TokenId;

/// Subword tokenizer that learns its vocabulary with byte pair merging.
///
/// Training takes `&mut self` and fully replaces any earlier state; encoding and
/// decoding take `&self` and may run from several threads at once.
///
/// ```
/// use sbpe::{BpeTokenizer, TrainerConfig};
///
/// # fn main() -> sbpe::Result<()> {
/// let mut tokenizer = BpeTokenizer::new(TrainerConfig::default());
/// tokenizer.train("hello world")?;
/// let ids = tokenizer.tokenize("hello world")?;
/// assert_eq!(tokenizer.detokenize(&ids), "hello world");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct BpeTokenizer {
    config: TrainerConfig,
    model: Option<BpeModel>,
    training: Option<TrainingMetrics>,
    last_encode: Mutex<Option<EncodeMetrics>>,
}

impl BpeTokenizer {
    /// Creates an untrained tokenizer.
    #[must_use]
    pub fn new(config: TrainerConfig) -> Self {
        Self {
            config,
            model: None,
            training: None,
            last_encode: Mutex::new(None),
        }
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Returns the trained model, if any.
    #[must_use]
    pub fn model(&self) -> Option<&BpeModel> {
        self.model.as_ref()
    }

    /// Returns `true` once a vocabulary has been trained or imported.
    #[must_use]
    pub fn is_trained(&self) -> bool {
        self.model
            .as_ref()
            .is_some_and(|model| !model.vocab().is_empty())
    }

    /// Current vocabulary size, zero when untrained.
    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.model.as_ref().map_or(0, BpeModel::vocab_size)
    }

    /// Statistics of the last successful training run.
    #[must_use]
    pub fn training_metrics(&self) -> Option<&TrainingMetrics> {
        self.training.as_ref()
    }

    /// Statistics of the most recent [`tokenize`](Self::tokenize) call.
    #[must_use]
    pub fn last_encode_metrics(&self) -> Option<EncodeMetrics> {
        *self
            .last_encode
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Discards the vocabulary, merge list and statistics.
    pub fn reset(&mut self) {
        debug!("resetting tokenizer state");
        self.model = None;
        self.training = None;
        *self
            .last_encode
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Learns a fresh vocabulary from `text`, discarding any previous state first.
    ///
    /// On failure the tokenizer is left reset and must be retrained before use.
    pub fn train(&mut self, text: &str) -> Result<()> {
        self.reset();
        let artifacts = Trainer::new(self.config.clone()).train(text)?;
        self.model = Some(artifacts.model);
        self.training = Some(artifacts.metrics);
        Ok(())
    }

    /// Converts `text` into token ids.
    pub fn tokenize(&self, text: &str) -> Result<Vec<TokenId>> {
        let model = self
            .model
            .as_ref()
            .filter(|model| !model.vocab().is_empty())
            .ok_or(BpeError::NotTrained)?;
        let start = Instant::now();
        let ids = model.encode(text);
        let metrics = EncodeMetrics::new(start.elapsed(), text.chars().count(), ids.len());
        *self
            .last_encode
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(metrics);
        Ok(ids)
    }

    /// Converts token ids back into space-separated words.
    ///
    /// Ids without a vocabulary entry are skipped with a warning.
    #[must_use]
    pub fn detokenize(&self, ids: &[TokenId]) -> String {
        match &self.model {
            Some(model) => model.decode(ids),
            None => {
                if !ids.is_empty() {
                    warn!("skipping {} token ids: tokenizer is not trained", ids.len());
                }
                String::new()
            }
        }
    }

    /// Encodes then decodes `text` and reports whether the round trip is exact.
    #[must_use]
    pub fn validate_round_trip(&self, text: &str) -> RoundTripReport {
        validate_round_trip(self, text)
    }

    /// Trains, encodes and validates each sample independently using this tokenizer's
    /// configuration.  The tokenizer's own state is left untouched.
    #[must_use]
    pub fn benchmark<S: AsRef<str>>(&self, texts: &[S]) -> BenchmarkReport {
        run_benchmark(&self.config, texts)
    }

    /// Captures the vocabulary, merges, configuration and last training statistics.
    #[must_use]
    pub fn export_vocabulary(&self) -> VocabularySnapshot {
        match &self.model {
            Some(model) => VocabularySnapshot::from_model(model, self.training.as_ref()),
            None => VocabularySnapshot::untrained(&self.config),
        }
    }

    /// Replaces the tokenizer state with `snapshot`.
    ///
    /// Configuration fields present in the snapshot override the current ones.
    /// Nothing changes when the snapshot is rejected.
    pub fn import_vocabulary(&mut self, snapshot: &VocabularySnapshot) -> Result<()> {
        let mut config = self.config.clone();
        config.apply_patch(&snapshot.config);
        config.validate()?;
        let model = if snapshot.is_empty() {
            None
        } else {
            Some(snapshot.build_model(&config)?)
        };

        self.reset();
        debug!(
            "imported vocabulary with {} entries and {} merges",
            snapshot.id_to_token.len(),
            snapshot.merges.len()
        );
        self.config = config;
        self.model = model;
        self.training = snapshot.stats.clone();
        Ok(())
    }

    /// Writes the exported snapshot to `path` as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P, pretty: bool) -> Result<()> {
        save_snapshot(&self.export_vocabulary(), path, pretty)
    }

    /// Loads a tokenizer from a JSON snapshot, starting from default configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let snapshot = load_snapshot(path)?;
        let mut tokenizer = Self::default();
        tokenizer.import_vocabulary(&snapshot)?;
        Ok(tokenizer)
    }
}
