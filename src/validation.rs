//! Encode → decode round-trip checks.

use serde::{Deserialize, Serialize};

use crate::preprocess::normalize_text;
use crate::tokenizer::BpeTokenizer;

/// Outcome of a round-trip validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundTripReport {
    /// `true` when the reconstruction equals the original and every id is in the vocabulary.
    pub valid: bool,
    /// Text that was encoded.
    pub original: String,
    /// Text produced by decoding the ids.
    pub reconstructed: String,
    /// `true` when every produced id has a vocabulary entry.
    pub ids_cover_ok: bool,
    /// `true` when the reconstruction equals the normalised (lowercased, single-spaced) original.
    pub normalized_match: bool,
    /// Number of ids produced by encoding.
    pub token_count: usize,
    /// Human-readable problems; empty when valid.
    pub errors: Vec<String>,
}

impl RoundTripReport {
    fn failed(original: &str, error: String) -> Self {
        Self {
            valid: false,
            original: original.to_owned(),
            reconstructed: String::new(),
            ids_cover_ok: false,
            normalized_match: false,
            token_count: 0,
            errors: vec![error],
        }
    }
}

/// Runs `tokenizer` over `text` and back, never failing: problems are reported in the result.
#[must_use]
pub fn validate_round_trip(tokenizer: &BpeTokenizer, text: &str) -> RoundTripReport {
    let ids = match tokenizer.tokenize(text) {
        Ok(ids) => ids,
        Err(err) => return RoundTripReport::failed(text, format!("encoding failed: {err}")),
    };
    let Some(model) = tokenizer.model() else {
        return RoundTripReport::failed(text, "tokenizer has no vocabulary".into());
    };

    let mut errors = Vec::new();
    let missing: Vec<_> = ids
        .iter()
        .filter(|&&id| !model.vocab().contains_id(id))
        .collect();
    let ids_cover_ok = missing.is_empty();
    for id in missing {
        errors.push(format!("token id {id} has no vocabulary entry"));
    }

    let reconstructed = tokenizer.detokenize(&ids);
    if reconstructed != text {
        errors.push(format!(
            "reconstructed text {reconstructed:?} differs from original {text:?}"
        ));
    }
    let normalized_match = reconstructed == normalize_text(text);

    RoundTripReport {
        valid: errors.is_empty(),
        original: text.to_owned(),
        reconstructed,
        ids_cover_ok,
        normalized_match,
        token_count: ids.len(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainerConfig;

    fn trained(text: &str) -> BpeTokenizer {
        let mut tok = BpeTokenizer::new(TrainerConfig::default());
        tok.train(text).expect("training");
        tok
    }

    #[test]
    fn normalized_text_round_trips() {
        let tok = trained("the cat and the hat");
        let report = tok.validate_round_trip("the cat and the hat");
        assert!(report.valid, "{:?}", report.errors);
        assert!(report.ids_cover_ok);
        assert!(report.normalized_match);
        assert!(report.errors.is_empty());
        assert_eq!(report.reconstructed, "the cat and the hat");
    }

    #[test]
    fn uppercase_input_fails_but_matches_normalized_form() {
        let tok = trained("the cat");
        let report = tok.validate_round_trip("The  Cat");
        assert!(!report.valid);
        assert!(report.ids_cover_ok);
        assert!(report.normalized_match);
        assert_eq!(report.reconstructed, "the cat");
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn unknown_characters_do_not_round_trip() {
        let tok = trained("abc");
        let report = tok.validate_round_trip("abz");
        assert!(!report.valid);
        assert!(report.ids_cover_ok);
        assert_eq!(report.reconstructed, "ab");
    }

    #[test]
    fn untrained_tokenizer_yields_invalid_report() {
        let tok = BpeTokenizer::new(TrainerConfig::default());
        let report = tok.validate_round_trip("hello");
        assert!(!report.valid);
        assert!(report.errors[0].contains("not been trained"));
    }
}
