//! Batch train/encode/validate runs with aggregated timing and quality figures.

use std::time::{Duration, Instant};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::TrainerConfig;
use crate::metrics::ratio;
use crate::tokenizer::BpeTokenizer;

/// Aggregated results of a benchmark batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkReport {
    /// Number of samples in the batch.
    pub samples: usize,
    /// Mean training time over samples that trained successfully.
    pub average_training_time: Duration,
    /// Mean tokenization time over samples that were tokenized.
    pub average_tokenization_time: Duration,
    /// Mean of `characters / vocabulary size` over trained samples.
    pub average_compression_ratio: f64,
    /// Mean of `characters / tokens` over tokenized samples.
    pub average_token_compression: f64,
    /// Percentage (0–100) of samples whose round trip was exact.
    pub round_trip_accuracy: f64,
    /// One message per sample that failed or errored.
    pub errors: Vec<String>,
}

#[derive(Default)]
struct Totals {
    trained: usize,
    tokenized: usize,
    passed: usize,
    training_time: Duration,
    tokenization_time: Duration,
    compression: f64,
    token_compression: f64,
}

/// Retrains a scratch tokenizer on each text and aggregates the outcome.
///
/// A failing sample is recorded in [`BenchmarkReport::errors`] and the batch carries on.
#[must_use]
pub fn run_benchmark<S: AsRef<str>>(config: &TrainerConfig, texts: &[S]) -> BenchmarkReport {
    let mut totals = Totals::default();
    let mut errors = Vec::new();

    for (idx, text) in texts.iter().enumerate() {
        let text = text.as_ref();
        let mut tokenizer = BpeTokenizer::new(config.clone());

        let start = Instant::now();
        if let Err(err) = tokenizer.train(text) {
            errors.push(format!("sample {idx}: training failed: {err}"));
            continue;
        }
        totals.trained += 1;
        totals.training_time += start.elapsed();
        if let Some(stats) = tokenizer.training_metrics() {
            totals.compression += stats.compression_ratio;
        }

        let start = Instant::now();
        let ids = match tokenizer.tokenize(text) {
            Ok(ids) => ids,
            Err(err) => {
                errors.push(format!("sample {idx}: tokenization failed: {err}"));
                continue;
            }
        };
        totals.tokenized += 1;
        totals.tokenization_time += start.elapsed();
        totals.token_compression += ratio(text.chars().count(), ids.len());

        let report = tokenizer.validate_round_trip(text);
        if report.valid {
            totals.passed += 1;
        } else {
            errors.push(format!("sample {idx}: {}", report.errors.join("; ")));
        }
    }

    debug!(
        "benchmarked {} samples: {} trained, {} passed",
        texts.len(),
        totals.trained,
        totals.passed
    );

    BenchmarkReport {
        samples: texts.len(),
        average_training_time: mean_duration(totals.training_time, totals.trained),
        average_tokenization_time: mean_duration(totals.tokenization_time, totals.tokenized),
        average_compression_ratio: mean(totals.compression, totals.trained),
        average_token_compression: mean(totals.token_compression, totals.tokenized),
        round_trip_accuracy: ratio(totals.passed * 100, texts.len()),
        errors,
    }
}

fn mean(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

fn mean_duration(total: Duration, count: usize) -> Duration {
    if count == 0 {
        Duration::ZERO
    } else {
        total.div_f64(count as f64)
    }
}
