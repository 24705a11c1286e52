//! Bidirectional token ↔ id mapping.

use std::convert::TryFrom;

use ahash::AHashMap;

use crate::error::{BpeError, Result};

/// Token identifier used throughout the crate.
pub type TokenId = u32;

/// Bijection between token strings and dense ids assigned from zero in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    token_to_id: AHashMap<String, TokenId>,
    id_to_token: Vec<String>,
}

impl Vocabulary {
    /// Creates an empty vocabulary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a vocabulary from tokens listed in id order.
    ///
    /// Fails when the same token appears twice.
    pub fn from_tokens<I>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut vocab = Self::new();
        for token in tokens {
            if vocab.contains(&token) {
                return Err(BpeError::InvalidSnapshot(format!(
                    "token {token:?} is assigned more than one id"
                )));
            }
            vocab.insert(token)?;
        }
        Ok(vocab)
    }

    /// Inserts `token` if absent and returns its id either way.
    pub fn insert(&mut self, token: String) -> Result<TokenId> {
        if let Some(&id) = self.token_to_id.get(&token) {
            return Ok(id);
        }
        let id = TokenId::try_from(self.id_to_token.len())
            .map_err(|_| BpeError::Internal("vocabulary size exceeded u32::MAX".into()))?;
        self.token_to_id.insert(token.clone(), id);
        self.id_to_token.push(token);
        Ok(id)
    }

    /// Looks up the id of `token`.
    #[must_use]
    pub fn id(&self, token: &str) -> Option<TokenId> {
        self.token_to_id.get(token).copied()
    }

    /// Looks up the token stored under `id`.
    #[must_use]
    pub fn token(&self, id: TokenId) -> Option<&str> {
        self.id_to_token.get(id as usize).map(String::as_str)
    }

    /// Returns `true` when `token` has an id.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.token_to_id.contains_key(token)
    }

    /// Returns `true` when `id` is assigned.
    #[must_use]
    pub fn contains_id(&self, id: TokenId) -> bool {
        (id as usize) < self.id_to_token.len()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.id_to_token.len()
    }

    /// Returns `true` when no token has been assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id_to_token.is_empty()
    }

    /// Iterates `(id, token)` in id order.
    pub fn iter(&self) -> impl Iterator<Item = (TokenId, &str)> + '_ {
        self.id_to_token
            .iter()
            .enumerate()
            .map(|(idx, token)| (idx as TokenId, token.as_str()))
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.token_to_id.clear();
        self.id_to_token.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dense_and_stable() {
        let mut vocab = Vocabulary::new();
        assert_eq!(vocab.insert("<unk>".into()).unwrap(), 0);
        assert_eq!(vocab.insert("a".into()).unwrap(), 1);
        assert_eq!(vocab.insert("<unk>".into()).unwrap(), 0);
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.token(1), Some("a"));
        assert_eq!(vocab.id("a"), Some(1));
        assert_eq!(vocab.token(2), None);
        assert!(vocab.contains_id(1));
        assert!(!vocab.contains_id(2));
    }

    #[test]
    fn from_tokens_rejects_duplicates() {
        let err = Vocabulary::from_tokens(vec!["a".to_string(), "a".to_string()]);
        assert!(matches!(err, Err(BpeError::InvalidSnapshot(_))));
    }

    #[test]
    fn clear_resets_ids() {
        let mut vocab = Vocabulary::from_tokens(vec!["x".to_string(), "y".to_string()]).unwrap();
        vocab.clear();
        assert!(vocab.is_empty());
        assert_eq!(vocab.insert("y".into()).unwrap(), 0);
    }
}
