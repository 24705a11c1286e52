//! Metrics describing training runs and tokenization calls.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reason a training run terminated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// The configured vocabulary size was reached.
    TargetVocabReached,
    /// The configured merge cap was reached.
    MaxMergesReached,
    /// No adjacent pair was left to merge.
    NoEligiblePairs,
    /// The best remaining pair occurred fewer than `min_frequency` times.
    BelowMinFrequency,
}

/// Metrics captured for each accepted merge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IterationMetrics {
    /// Sequential iteration number (1-indexed).
    pub iteration: usize,
    /// Left symbol of the merged pair.
    pub left: String,
    /// Right symbol of the merged pair.
    pub right: String,
    /// Weighted count of the pair when it was selected.
    pub frequency: usize,
    /// Weighted number of replacements performed across the word table.
    pub replacements: usize,
    /// Count of distinct pairs seen during the iteration's scan.
    pub distinct_pairs: usize,
    /// Vocabulary size after the merge.
    pub vocab_size: usize,
    /// Execution time for the iteration.
    pub elapsed_iteration: Duration,
    /// Total time elapsed since training started.
    pub elapsed_total: Duration,
}

/// Aggregate statistics produced by a training run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingMetrics {
    /// Per-merge snapshots accrued during training.
    #[serde(default)]
    pub iterations: Vec<IterationMetrics>,
    /// Total duration of the training run.
    pub total_duration: Duration,
    /// Reason training terminated.
    pub stop_reason: StopReason,
    /// Resulting vocabulary size.
    pub vocab_size: usize,
    /// Number of merges learned.
    pub merge_count: usize,
    /// Number of distinct words in the training text.
    pub unique_words: usize,
    /// Number of words in the training text.
    pub total_words: usize,
    /// Number of characters in the raw training text.
    pub input_chars: usize,
    /// `input_chars / vocab_size`.
    pub compression_ratio: f64,
}

impl TrainingMetrics {
    /// Creates an empty metrics container with pre-allocated capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            iterations: Vec::with_capacity(capacity),
            total_duration: Duration::ZERO,
            stop_reason: StopReason::TargetVocabReached,
            vocab_size: 0,
            merge_count: 0,
            unique_words: 0,
            total_words: 0,
            input_chars: 0,
            compression_ratio: 0.0,
        }
    }
}

/// Statistics recorded for the most recent tokenization call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EncodeMetrics {
    /// Wall-clock time taken by the call.
    pub elapsed: Duration,
    /// Characters in the input text.
    pub char_count: usize,
    /// Token ids produced.
    pub token_count: usize,
    /// `char_count / token_count`, or zero when no tokens were produced.
    pub compression_ratio: f64,
}

impl EncodeMetrics {
    /// Builds metrics for a call, deriving the compression ratio.
    #[must_use]
    pub fn new(elapsed: Duration, char_count: usize, token_count: usize) -> Self {
        Self {
            elapsed,
            char_count,
            token_count,
            compression_ratio: ratio(char_count, token_count),
        }
    }
}

/// Divides `numerator` by `denominator`, yielding zero for an empty denominator.
#[must_use]
pub fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_handles_zero_denominator() {
        assert_eq!(ratio(10, 0), 0.0);
        assert!((ratio(10, 4) - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn encode_metrics_derive_compression() {
        let metrics = EncodeMetrics::new(Duration::from_millis(3), 12, 3);
        assert!((metrics.compression_ratio - 4.0).abs() < f64::EPSILON);
    }
}
