//! Text normalisation applied before training and encoding.
//!
//! Training lowercases its input, collapses whitespace runs and splits on
//! whitespace; identical words collapse into one [`WordCount`] entry.  Encoding
//! only lowercases and splits, keeping the original word order.

use ahash::AHashMap;

/// A distinct word and the number of times it appeared in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordCount {
    /// Normalised word text (no whitespace).
    pub word: String,
    /// Number of occurrences of the word.
    pub count: usize,
}

/// Distinct words in first-occurrence order together with their counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordCounts {
    entries: Vec<WordCount>,
    total_words: usize,
    total_chars: usize,
}

impl WordCounts {
    /// Builds the table from already normalised words.
    pub fn from_words<'a, I>(words: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut index: AHashMap<&'a str, usize> = AHashMap::new();
        let mut counts = Self::default();
        for word in words {
            counts.total_words += 1;
            counts.total_chars += word.chars().count();
            match index.get(word) {
                Some(&slot) => counts.entries[slot].count += 1,
                None => {
                    index.insert(word, counts.entries.len());
                    counts.entries.push(WordCount {
                        word: word.to_owned(),
                        count: 1,
                    });
                }
            }
        }
        counts
    }

    /// Distinct words in the order they were first seen.
    #[must_use]
    pub fn entries(&self) -> &[WordCount] {
        &self.entries
    }

    /// Number of distinct words.
    #[must_use]
    pub fn unique_words(&self) -> usize {
        self.entries.len()
    }

    /// Total number of words, duplicates included.
    #[must_use]
    pub fn total_words(&self) -> usize {
        self.total_words
    }

    /// Total number of characters across all words, duplicates included.
    #[must_use]
    pub fn total_chars(&self) -> usize {
        self.total_chars
    }

    /// Returns `true` when no words were collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lowercases `text`, collapses whitespace runs into single spaces and trims both ends.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercases `text` and splits it into whitespace-separated words.
#[must_use]
pub fn split_words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

/// Normalises `text` and counts its words for training.
#[must_use]
pub fn count_words(text: &str) -> WordCounts {
    let normalized = normalize_text(text);
    WordCounts::from_words(normalized.split(' ').filter(|word| !word.is_empty()))
}
