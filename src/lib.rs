//! Character-level byte pair encoding (BPE) subword tokenizer library and CLI.
//!
//! The crate learns a fixed-size vocabulary from training text by repeatedly
//! merging the most frequent adjacent symbol pair, then uses the vocabulary and
//! the ordered merge list to turn text into token ids and back.  Typical usage
//! trains a [`BpeTokenizer`], encodes text, and persists the vocabulary as JSON.
//!
//! ```no_run
//! use sbpe::{BpeTokenizer, TrainerConfig};
//!
//! # fn main() -> sbpe::Result<()> {
//! let cfg = TrainerConfig::builder()
//!     .vocab_size(500)
//!     .min_frequency(2)
//!     .build()?;
//! let mut tokenizer = BpeTokenizer::new(cfg);
//! tokenizer.train(&std::fs::read_to_string("corpus.txt").unwrap_or_default())?;
//! let ids = tokenizer.tokenize("some new text")?;
//! println!("{}", tokenizer.detokenize(&ids));
//! tokenizer.save("vocab.json", true)?;
//! # Ok(())
//! # }
//! ```
//!
//! The CLI is enabled by default through the `cli` feature.  Users targeting the
//! library portion only can disable default features to avoid the CLI
//! dependencies: `subword-bpe = { version = "...", default-features = false }`.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::multiple_crate_versions
)]

pub mod benchmark;
pub mod config;
pub mod corpus;
pub mod error;
pub mod metrics;
pub mod model;
pub mod preprocess;
pub mod serialization;
pub mod tokenizer;
pub mod trainer;
pub mod validation;
pub mod vocab;

pub use benchmark::BenchmarkReport;
pub use config::{ConfigPatch, IngestConfig, TrainerBuilder, TrainerConfig};
pub use error::{BpeError, Result};
pub use metrics::{EncodeMetrics, IterationMetrics, StopReason, TrainingMetrics};
pub use model::{BpeModel, MergeRule};
pub use serialization::VocabularySnapshot;
pub use tokenizer::BpeTokenizer;
pub use trainer::{Trainer, TrainerArtifacts};
pub use validation::RoundTripReport;
pub use vocab::{TokenId, Vocabulary};
