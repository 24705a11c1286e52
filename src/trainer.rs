//! Core training loop: word table construction, pair counting and merge application.

use std::collections::BTreeSet;
use std::time::Instant;
use std::{fmt, path::Path};

use log::{debug, info};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::config::{IngestConfig, TrainerBuilder, TrainerConfig};
use crate::corpus::load_text_corpus;
use crate::error::{BpeError, Result};
use crate::metrics::{ratio, IterationMetrics, StopReason, TrainingMetrics};
use crate::model::{BpeModel, MergeRule, Pair};
use crate::preprocess::count_words;
use crate::vocab::{TokenId, Vocabulary};

mod word;

pub(crate) use word::Word;

/// High-level façade configuring and executing BPE training runs.
#[derive(Debug, Clone)]
pub struct Trainer {
    cfg: TrainerConfig,
}

/// Artifacts returned after a training session completes.
#[must_use]
#[derive(Debug, Clone)]
pub struct TrainerArtifacts {
    /// Trained BPE model.
    pub model: BpeModel,
    /// Statistics captured during training.
    pub metrics: TrainingMetrics,
}

/// One entry of the word frequency table: a word's symbol sequence and its occurrence count.
#[derive(Debug, Clone)]
struct WordEntry {
    word: Word,
    count: usize,
}

impl Trainer {
    /// Creates a new trainer for the supplied configuration.
    #[must_use]
    pub fn new(cfg: TrainerConfig) -> Self {
        Self { cfg }
    }

    /// Returns a [`TrainerBuilder`] with default settings.
    #[must_use]
    pub fn builder() -> TrainerBuilder {
        TrainerConfig::builder()
    }

    /// Returns an immutable reference to the underlying configuration.
    #[must_use]
    pub fn config(&self) -> &TrainerConfig {
        &self.cfg
    }

    /// Trains on the concatenation of every text file discovered under `inputs`.
    pub fn train_from_paths<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        ingest: &IngestConfig,
    ) -> Result<TrainerArtifacts> {
        let documents = load_text_corpus(inputs, ingest)?;
        self.train(&documents.join("\n"))
    }

    /// Learns a vocabulary and merge list from `text`.
    pub fn train(&self, text: &str) -> Result<TrainerArtifacts> {
        self.cfg.validate()?;
        let counts = count_words(text);
        if counts.is_empty() {
            return Err(BpeError::InvalidInput(
                "training text must contain at least one non-whitespace character".into(),
            ));
        }

        let training_start = Instant::now();
        let mut vocab = Vocabulary::new();
        for token in &self.cfg.special_tokens {
            vocab.insert(token.clone())?;
        }

        let alphabet: BTreeSet<char> = counts
            .entries()
            .iter()
            .flat_map(|entry| entry.word.chars())
            .collect();
        let mut buf = [0u8; 4];
        for ch in &alphabet {
            vocab.insert(ch.encode_utf8(&mut buf).to_owned())?;
        }
        let end_of_word = vocab.insert(self.cfg.end_of_word.clone())?;
        if vocab.len() > self.cfg.vocab_size {
            return Err(BpeError::AlphabetOverflow {
                required: vocab.len(),
                limit: self.cfg.vocab_size,
            });
        }

        let mut words = Vec::with_capacity(counts.unique_words());
        for entry in counts.entries() {
            let mut symbols = Vec::with_capacity(entry.word.chars().count() + 1);
            for ch in entry.word.chars() {
                let id = vocab.id(ch.encode_utf8(&mut buf)).ok_or_else(|| {
                    BpeError::Internal(format!("character {ch:?} missing from alphabet"))
                })?;
                symbols.push(id);
            }
            symbols.push(end_of_word);
            words.push(WordEntry {
                word: Word::from_tokens(symbols),
                count: entry.count,
            });
        }
        debug!(
            "seeded vocabulary with {} entries from {} distinct words",
            vocab.len(),
            words.len()
        );

        let mut merges: Vec<MergeRule> = Vec::new();
        let mut metrics = TrainingMetrics::new(self.cfg.max_merges.min(4096));

        loop {
            if vocab.len() >= self.cfg.vocab_size {
                metrics.stop_reason = StopReason::TargetVocabReached;
                break;
            }
            if merges.len() >= self.cfg.max_merges {
                metrics.stop_reason = StopReason::MaxMergesReached;
                break;
            }

            let iteration_start = Instant::now();
            let pair_counts = compute_pair_counts(&words);
            let Some((best_pair, frequency)) = select_best_pair(&pair_counts, &vocab, &self.cfg)
            else {
                metrics.stop_reason = StopReason::NoEligiblePairs;
                break;
            };
            if frequency < self.cfg.min_frequency {
                metrics.stop_reason = StopReason::BelowMinFrequency;
                break;
            }

            let left = symbol_text(&vocab, best_pair.0)?.to_owned();
            let right = symbol_text(&vocab, best_pair.1)?.to_owned();
            let merged = vocab.insert(format!("{left}{right}"))?;
            let replacements = apply_merge(&mut words, best_pair, merged);
            merges.push(MergeRule {
                left: best_pair.0,
                right: best_pair.1,
                merged,
            });

            let iteration = merges.len();
            if self.cfg.show_progress {
                info!(
                    "iter {:>6} freq {:>8} merges {:>8} distinct_pairs {:>8} vocab {:>8} ({left:?} + {right:?})",
                    iteration,
                    frequency,
                    replacements,
                    pair_counts.len(),
                    vocab.len()
                );
            }
            metrics.iterations.push(IterationMetrics {
                iteration,
                left,
                right,
                frequency,
                replacements,
                distinct_pairs: pair_counts.len(),
                vocab_size: vocab.len(),
                elapsed_iteration: iteration_start.elapsed(),
                elapsed_total: training_start.elapsed(),
            });
        }

        let input_chars = text.chars().count();
        metrics.total_duration = training_start.elapsed();
        metrics.vocab_size = vocab.len();
        metrics.merge_count = merges.len();
        metrics.unique_words = counts.unique_words();
        metrics.total_words = counts.total_words();
        metrics.input_chars = input_chars;
        metrics.compression_ratio = ratio(input_chars, vocab.len());

        if self.cfg.show_progress {
            info!(
                "completed {} merges in {:.2?}; vocab size {}; stop reason {:?}",
                merges.len(),
                metrics.total_duration,
                vocab.len(),
                metrics.stop_reason
            );
        }

        let model = BpeModel::new(vocab, merges, self.cfg.clone())?;
        Ok(TrainerArtifacts { model, metrics })
    }
}

fn symbol_text(vocab: &Vocabulary, id: TokenId) -> Result<&str> {
    vocab
        .token(id)
        .ok_or_else(|| BpeError::Internal(format!("symbol id {id} missing from vocabulary")))
}

/// Sums `count(word) × occurrences(pair in word)` for every adjacent pair in the table.
fn compute_pair_counts(words: &[WordEntry]) -> FxHashMap<Pair, usize> {
    words
        .par_iter()
        .map(|entry| {
            let mut local = FxHashMap::default();
            if entry.word.has_pairs() {
                entry.word.for_each_pair(|pair| {
                    *local.entry(pair).or_insert(0) += entry.count;
                });
            }
            local
        })
        .reduce(FxHashMap::default, |mut acc, local| {
            for (pair, count) in local {
                *acc.entry(pair).or_insert(0) += count;
            }
            acc
        })
}

/// Picks the pair with the highest count; ties go to the lexicographically smallest
/// `(left, right)` symbol texts.  Pairs that would spell a reserved token are skipped.
fn select_best_pair(
    pair_counts: &FxHashMap<Pair, usize>,
    vocab: &Vocabulary,
    cfg: &TrainerConfig,
) -> Option<(Pair, usize)> {
    let mut best: Option<(Pair, usize, &str, &str)> = None;
    for (&pair, &count) in pair_counts {
        let (Some(left), Some(right)) = (vocab.token(pair.0), vocab.token(pair.1)) else {
            continue;
        };
        let better = match best {
            None => true,
            Some((_, best_count, best_left, best_right)) => {
                count > best_count
                    || (count == best_count && (left, right) < (best_left, best_right))
            }
        };
        if better && !spells_reserved(left, right, cfg) {
            best = Some((pair, count, left, right));
        }
    }
    best.map(|(pair, count, _, _)| (pair, count))
}

fn spells_reserved(left: &str, right: &str, cfg: &TrainerConfig) -> bool {
    let spells = |token: &str| {
        token.len() == left.len() + right.len()
            && token.starts_with(left)
            && token.ends_with(right)
    };
    spells(&cfg.end_of_word) || cfg.special_tokens.iter().any(|token| spells(token))
}

/// Rewrites every word, returning the weighted number of replacements.
fn apply_merge(words: &mut [WordEntry], pair: Pair, merged: TokenId) -> usize {
    words
        .par_iter_mut()
        .map(|entry| entry.word.merge(pair.0, pair.1, merged) * entry.count)
        .sum()
}

impl fmt::Display for TrainerArtifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BPE model with vocab size {}", self.model.vocab_size())?;
        writeln!(f, "Merges: {}", self.model.merges().len())?;
        writeln!(f, "Stop reason: {:?}", self.metrics.stop_reason)?;
        writeln!(f, "Total duration: {:?}", self.metrics.total_duration)?;
        Ok(())
    }
}
