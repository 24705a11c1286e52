//! Trained model: vocabulary plus ordered merge list, with encode and decode.

use std::mem;

use ahash::AHashMap;
use log::warn;

use crate::config::TrainerConfig;
use crate::error::{BpeError, Result};
use crate::preprocess::split_words;
use crate::trainer::Word;
use crate::vocab::{TokenId, Vocabulary};

/// Merge pair encoded as `(left, right)` token identifiers.
pub type Pair = (TokenId, TokenId);

/// One learned merge: `left` followed by `right` collapses into `merged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MergeRule {
    /// Id of the left symbol.
    pub left: TokenId,
    /// Id of the right symbol.
    pub right: TokenId,
    /// Id of the concatenated symbol.
    pub merged: TokenId,
}

impl MergeRule {
    /// Returns the `(left, right)` pair.
    #[must_use]
    pub fn pair(&self) -> Pair {
        (self.left, self.right)
    }
}

/// Trained BPE model containing the learned vocabulary and merge list.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub struct BpeModel {
    vocab: Vocabulary,
    merges: Vec<MergeRule>,
    config: TrainerConfig,
    unknown_id: TokenId,
    end_of_word_id: TokenId,
}

impl BpeModel {
    /// Assembles a model, resolving the unknown-token and end-of-word ids.
    pub fn new(vocab: Vocabulary, merges: Vec<MergeRule>, config: TrainerConfig) -> Result<Self> {
        let unknown_id = vocab.id(&config.unknown_token).ok_or_else(|| {
            BpeError::InvalidSnapshot(format!(
                "vocabulary is missing the unknown token {:?}",
                config.unknown_token
            ))
        })?;
        let end_of_word_id = vocab.id(&config.end_of_word).ok_or_else(|| {
            BpeError::InvalidSnapshot(format!(
                "vocabulary is missing the end-of-word marker {:?}",
                config.end_of_word
            ))
        })?;
        for rule in &merges {
            for id in [rule.left, rule.right, rule.merged] {
                if !vocab.contains_id(id) {
                    return Err(BpeError::InvalidSnapshot(format!(
                        "merge references unassigned id {id}"
                    )));
                }
            }
        }
        Ok(Self {
            vocab,
            merges,
            config,
            unknown_id,
            end_of_word_id,
        })
    }

    /// Returns the vocabulary.
    #[must_use]
    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Returns the merges in the order they were learned.
    #[must_use]
    pub fn merges(&self) -> &[MergeRule] {
        &self.merges
    }

    /// Returns the merges as `(left, right)` symbol texts.
    #[must_use]
    pub fn merge_strings(&self) -> Vec<(String, String)> {
        self.merges
            .iter()
            .map(|rule| (self.symbol(rule.left), self.symbol(rule.right)))
            .collect()
    }

    /// Returns the [`TrainerConfig`] used to produce the model.
    #[must_use]
    pub fn trainer_config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Returns the total vocabulary size including special tokens.
    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    /// Id substituted for symbols missing from the vocabulary.
    #[must_use]
    pub fn unknown_id(&self) -> TokenId {
        self.unknown_id
    }

    /// Id of the end-of-word marker.
    #[must_use]
    pub fn end_of_word_id(&self) -> TokenId {
        self.end_of_word_id
    }

    /// Lowercases and splits `text`, then encodes each word in order.
    #[must_use]
    pub fn encode(&self, text: &str) -> Vec<TokenId> {
        let words = split_words(text);
        let mut cache: AHashMap<&str, Vec<TokenId>> = AHashMap::new();
        let mut ids = Vec::with_capacity(text.len());
        for word in &words {
            let encoded = cache
                .entry(word.as_str())
                .or_insert_with(|| self.encode_word(word));
            ids.extend_from_slice(encoded);
        }
        ids
    }

    /// Encodes one already normalised word, end-of-word marker included.
    #[must_use]
    pub fn encode_word(&self, word: &str) -> Vec<TokenId> {
        let mut buf = [0u8; 4];
        let mut symbols: Vec<TokenId> = word
            .chars()
            .map(|ch| {
                self.vocab
                    .id(ch.encode_utf8(&mut buf))
                    .unwrap_or(self.unknown_id)
            })
            .collect();
        symbols.push(self.end_of_word_id);

        let mut word = Word::from_tokens(symbols);
        for rule in &self.merges {
            if !word.has_pairs() {
                break;
            }
            word.merge(rule.left, rule.right, rule.merged);
        }
        word.into_tokens()
    }

    /// Rebuilds space-separated text from token ids.
    ///
    /// Unknown ids are skipped with a warning and special tokens contribute
    /// nothing.  A symbol ending with the end-of-word marker closes the
    /// current word.
    #[must_use]
    pub fn decode(&self, ids: &[TokenId]) -> String {
        let marker = self.config.end_of_word.as_str();
        let mut words: Vec<String> = Vec::new();
        let mut buffer = String::new();
        for &id in ids {
            let Some(token) = self.vocab.token(id) else {
                warn!("skipping unknown token id {id} during decode");
                continue;
            };
            if self.config.is_special(token) {
                continue;
            }
            match token.strip_suffix(marker) {
                Some(stem) => {
                    buffer.push_str(stem);
                    words.push(mem::take(&mut buffer));
                }
                None => buffer.push_str(token),
            }
        }
        if !buffer.is_empty() {
            words.push(buffer);
        }
        words.join(" ")
    }

    fn symbol(&self, id: TokenId) -> String {
        self.vocab.token(id).unwrap_or_default().to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trainer::Trainer;

    fn trained(text: &str, min_frequency: usize) -> BpeModel {
        let cfg = TrainerConfig::builder()
            .min_frequency(min_frequency)
            .build()
            .expect("valid config");
        Trainer::new(cfg).train(text).expect("training").model
    }

    #[test]
    fn hello_world_round_trips() {
        let model = trained("hello world", 2);
        let ids = model.encode("hello world");
        assert_eq!(ids.len(), 12);
        assert_eq!(model.decode(&ids), "hello world");
    }

    #[test]
    fn encode_applies_merges_in_training_order() {
        let model = trained("low low low lower lower newest newest", 2);
        let ids = model.encode("low");
        let tokens: Vec<&str> = ids
            .iter()
            .map(|&id| model.vocab().token(id).unwrap())
            .collect();
        assert_eq!(tokens.concat(), "low</w>");
        assert!(tokens.len() < 4, "merges should shorten {tokens:?}");
    }

    #[test]
    fn unknown_characters_map_to_unknown_id() {
        let model = trained("abc abc", 2);
        let ids = model.encode("abz");
        assert!(ids.contains(&model.unknown_id()));
        assert_eq!(*ids.last().unwrap(), model.end_of_word_id());
        assert!(ids.iter().all(|&id| model.vocab().contains_id(id)));
    }

    #[test]
    fn encode_lowercases_and_keeps_word_order() {
        let model = trained("ab ba", 1);
        assert_eq!(model.encode("BA ab"), {
            let mut expected = model.encode_word("ba");
            expected.extend(model.encode_word("ab"));
            expected
        });
        assert!(model.encode("").is_empty());
        assert!(model.encode("   ").is_empty());
    }

    #[test]
    fn decode_skips_unknown_and_special_ids() {
        let model = trained("hello world", 2);
        assert_eq!(model.decode(&[999_999]), "");
        assert_eq!(model.decode(&[]), "");
        let mut ids = vec![0, 2];
        ids.extend(model.encode("hello"));
        ids.push(999_999);
        ids.push(3);
        assert_eq!(model.decode(&ids), "hello");
    }

    #[test]
    fn decode_flushes_after_merged_end_of_word_symbols() {
        let model = trained("b b b", 2);
        let ids = model.encode("b b b");
        assert_eq!(ids.len(), 3);
        assert_eq!(model.vocab().token(ids[0]), Some("b</w>"));
        assert_eq!(model.decode(&ids), "b b b");
    }

    #[test]
    fn decode_flushes_trailing_partial_word() {
        let model = trained("hello world", 2);
        let mut ids = model.encode("hello");
        ids.pop();
        assert_eq!(model.decode(&ids), "hello");
    }

    #[test]
    fn new_rejects_vocab_without_unknown_token() {
        let vocab = Vocabulary::from_tokens(vec!["a".to_string(), "</w>".to_string()]).unwrap();
        let err = BpeModel::new(vocab, Vec::new(), TrainerConfig::default()).unwrap_err();
        assert!(matches!(err, BpeError::InvalidSnapshot(_)));
    }
}
