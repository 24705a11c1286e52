use crate::model::Pair;
use crate::vocab::TokenId;

/// Symbol sequence of a single word, each symbol referenced by its vocabulary id.
///
/// Matching on ids rather than text means a merge only ever fires on whole
/// adjacent symbols: a longer symbol that merely ends with the left symbol's
/// text has a different id and is never mistaken for it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Word {
    symbols: Vec<TokenId>,
}

impl Word {
    /// Builds a word from an owned symbol sequence.
    pub(crate) fn from_tokens(symbols: Vec<TokenId>) -> Self {
        Self { symbols }
    }

    /// Current symbols of the word.
    #[cfg(test)]
    pub(crate) fn tokens(&self) -> &[TokenId] {
        &self.symbols
    }

    /// Consumes the word, returning its symbols.
    pub(crate) fn into_tokens(self) -> Vec<TokenId> {
        self.symbols
    }

    /// Returns true when the word contains at least two symbols.
    pub(crate) fn has_pairs(&self) -> bool {
        self.symbols.len() >= 2
    }

    /// Invokes the provided closure for each adjacent symbol pair, overlapping pairs included.
    pub(crate) fn for_each_pair<F>(&self, mut f: F)
    where
        F: FnMut(Pair),
    {
        for window in self.symbols.windows(2) {
            f((window[0], window[1]));
        }
    }

    /// Collapses every non-overlapping occurrence of `(left, right)`, scanning left to right.
    ///
    /// Returns the number of occurrences replaced.
    pub(crate) fn merge(&mut self, left: TokenId, right: TokenId, replacement: TokenId) -> usize {
        if self.symbols.len() < 2 {
            return 0;
        }

        let original_len = self.symbols.len();
        let mut read = 0usize;
        let mut write = 0usize;
        let mut merges = 0usize;

        while read < original_len {
            if read + 1 < original_len
                && self.symbols[read] == left
                && self.symbols[read + 1] == right
            {
                self.symbols[write] = replacement;
                read += 2;
                merges += 1;
            } else {
                self.symbols[write] = self.symbols[read];
                read += 1;
            }
            write += 1;
        }

        self.symbols.truncate(write);
        merges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_replaces_all_pairs() {
        let mut word = Word::from_tokens(vec![1, 2, 1, 2, 3]);
        assert!(word.has_pairs());
        let merges = word.merge(1, 2, 99);
        assert_eq!(merges, 2);
        assert_eq!(word.tokens(), &[99, 99, 3]);
    }

    #[test]
    fn merge_is_non_overlapping_leftmost() {
        let mut word = Word::from_tokens(vec![7, 7, 7]);
        assert_eq!(word.merge(7, 7, 8), 1);
        assert_eq!(word.tokens(), &[8, 7]);

        let mut even = Word::from_tokens(vec![7, 7, 7, 7]);
        assert_eq!(even.merge(7, 7, 8), 2);
        assert_eq!(even.into_tokens(), vec![8, 8]);
    }

    #[test]
    fn merge_ignores_symbols_sharing_text_suffix() {
        // 10 stands for "ab", 2 for "b": the pair (2, 3) must not match (10, 3).
        let mut word = Word::from_tokens(vec![10, 3, 2, 3]);
        assert_eq!(word.merge(2, 3, 11), 1);
        assert_eq!(word.tokens(), &[10, 3, 11]);
    }

    #[test]
    fn single_symbol_words_have_no_pairs() {
        let mut word = Word::from_tokens(vec![4]);
        assert!(!word.has_pairs());
        assert_eq!(word.merge(4, 4, 5), 0);
        let mut collected = Vec::new();
        word.for_each_pair(|pair| collected.push(pair));
        assert!(collected.is_empty());
    }

    #[test]
    fn enumerate_pairs_includes_overlaps() {
        let word = Word::from_tokens(vec![1, 1, 1]);
        let mut collected = Vec::new();
        word.for_each_pair(|pair| collected.push(pair));
        assert_eq!(collected, vec![(1, 1), (1, 1)]);
    }
}
