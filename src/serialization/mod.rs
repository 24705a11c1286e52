//! Helpers for (de)serialising trained vocabularies.

pub mod snapshot;

pub use snapshot::{load_snapshot, save_snapshot, VocabularySnapshot};
