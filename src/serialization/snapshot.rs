//! Plain, serde-friendly snapshot of a trained tokenizer.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigPatch, TrainerConfig};
use crate::error::{BpeError, Result};
use crate::metrics::TrainingMetrics;
use crate::model::{BpeModel, MergeRule};
use crate::vocab::{TokenId, Vocabulary};

/// Exported tokenizer state: both vocabulary directions, the merge list, configuration and stats.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VocabularySnapshot {
    /// Token → id mapping.
    pub token_to_id: BTreeMap<String, TokenId>,
    /// Id → token mapping.
    pub id_to_token: BTreeMap<TokenId, String>,
    /// Merge list as `(left, right)` symbol texts, in training order.
    #[serde(default)]
    pub merges: Vec<(String, String)>,
    /// Configuration fields; absent fields keep the importer's current values.
    #[serde(default)]
    pub config: ConfigPatch,
    /// Statistics of the training run that produced the vocabulary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<TrainingMetrics>,
}

impl VocabularySnapshot {
    /// Captures a model and the statistics of the run that produced it.
    #[must_use]
    pub fn from_model(model: &BpeModel, stats: Option<&TrainingMetrics>) -> Self {
        let vocab = model.vocab();
        Self {
            token_to_id: vocab
                .iter()
                .map(|(id, token)| (token.to_owned(), id))
                .collect(),
            id_to_token: vocab
                .iter()
                .map(|(id, token)| (id, token.to_owned()))
                .collect(),
            merges: model.merge_strings(),
            config: ConfigPatch::from(model.trainer_config()),
            stats: stats.cloned(),
        }
    }

    /// Snapshot of an untrained tokenizer: configuration only.
    #[must_use]
    pub fn untrained(config: &TrainerConfig) -> Self {
        Self {
            config: ConfigPatch::from(config),
            ..Self::default()
        }
    }

    /// Returns `true` when the snapshot carries no vocabulary.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id_to_token.is_empty() && self.token_to_id.is_empty() && self.merges.is_empty()
    }

    /// Rebuilds a model under `config`, keeping every id exactly as recorded.
    pub fn build_model(&self, config: &TrainerConfig) -> Result<BpeModel> {
        if self.token_to_id.len() != self.id_to_token.len() {
            return Err(BpeError::InvalidSnapshot(format!(
                "token_to_id has {} entries but id_to_token has {}",
                self.token_to_id.len(),
                self.id_to_token.len()
            )));
        }
        for (expected, (&id, token)) in self.id_to_token.iter().enumerate() {
            if id as usize != expected {
                return Err(BpeError::InvalidSnapshot(format!(
                    "ids must be contiguous from 0; found {id} at position {expected}"
                )));
            }
            if self.token_to_id.get(token) != Some(&id) {
                return Err(BpeError::InvalidSnapshot(format!(
                    "token {token:?} does not map back to id {id}"
                )));
            }
        }
        let vocab = Vocabulary::from_tokens(self.id_to_token.values().cloned())?;

        let lookup = |token: &str| {
            vocab.id(token).ok_or_else(|| {
                BpeError::InvalidSnapshot(format!("merge symbol {token:?} is not in the vocabulary"))
            })
        };
        let mut merges = Vec::with_capacity(self.merges.len());
        for (left, right) in &self.merges {
            merges.push(MergeRule {
                left: lookup(left)?,
                right: lookup(right)?,
                merged: lookup(&format!("{left}{right}"))?,
            });
        }
        BpeModel::new(vocab, merges, config.clone())
    }

    /// Serialises the snapshot to JSON.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    /// Parses a snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Writes `snapshot` to `path` as JSON.
pub fn save_snapshot<P: AsRef<Path>>(
    snapshot: &VocabularySnapshot,
    path: P,
    pretty: bool,
) -> Result<()> {
    let json = snapshot.to_json(pretty)?;
    fs::write(path.as_ref(), json)
        .map_err(|err| BpeError::io(err, Some(path.as_ref().to_path_buf())))
}

/// Reads a JSON snapshot from `path`.
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<VocabularySnapshot> {
    let json = fs::read_to_string(path.as_ref())
        .map_err(|err| BpeError::io(err, Some(path.as_ref().to_path_buf())))?;
    VocabularySnapshot::from_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trainer::Trainer;
    use serde_json::Value;
    use tempfile::tempdir;

    fn sample() -> (BpeModel, TrainingMetrics) {
        let artefacts = Trainer::new(TrainerConfig::default())
            .train("the cat sat on the mat the end")
            .expect("training");
        (artefacts.model, artefacts.metrics)
    }

    #[test]
    fn snapshot_rebuilds_identical_model() {
        let (model, metrics) = sample();
        let snapshot = VocabularySnapshot::from_model(&model, Some(&metrics));
        let rebuilt = snapshot
            .build_model(model.trainer_config())
            .expect("rebuild");
        assert_eq!(rebuilt, model);
    }

    #[test]
    fn json_layout_is_plain() {
        let (model, metrics) = sample();
        let json = VocabularySnapshot::from_model(&model, Some(&metrics))
            .to_json(true)
            .expect("json");
        let value: Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["token_to_id"]["<pad>"], 0);
        assert_eq!(value["id_to_token"]["0"], "<pad>");
        assert_eq!(value["merges"][0][0], "a");
        assert_eq!(value["merges"][0][1], "t");
        assert_eq!(value["config"]["vocab_size"], 1000);
        assert_eq!(value["stats"]["merge_count"], model.merges().len());
    }

    #[test]
    fn rejects_non_contiguous_ids() {
        let (model, _) = sample();
        let mut snapshot = VocabularySnapshot::from_model(&model, None);
        let last = (snapshot.id_to_token.len() - 1) as TokenId;
        let token = snapshot.id_to_token.remove(&last).expect("last token");
        snapshot.id_to_token.insert(last + 5, token.clone());
        snapshot.token_to_id.insert(token, last + 5);
        let err = snapshot.build_model(model.trainer_config()).unwrap_err();
        assert!(matches!(err, BpeError::InvalidSnapshot(message) if message.contains("contiguous")));
    }

    #[test]
    fn rejects_merges_with_missing_symbols() {
        let (model, _) = sample();
        let mut snapshot = VocabularySnapshot::from_model(&model, None);
        snapshot.merges.push(("q".into(), "z".into()));
        let err = snapshot.build_model(model.trainer_config()).unwrap_err();
        assert!(matches!(err, BpeError::InvalidSnapshot(_)));
    }

    #[test]
    fn save_and_load_round_trip() {
        let (model, _) = sample();
        let snapshot = VocabularySnapshot::from_model(&model, None);
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("vocab.json");
        save_snapshot(&snapshot, &path, false).expect("save");
        let loaded = load_snapshot(&path).expect("load");
        assert_eq!(loaded, snapshot);
    }
}
