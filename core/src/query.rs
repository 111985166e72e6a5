use crate::error::RankError;
use indexmap::IndexMap;

/// Raw term counts of a query, used to weight the query side of both ranking schemes.
///
/// Distinct words keep the order of their first appearance in the query.
#[derive(Debug, Clone, Default)]
pub struct QueryTermStats {
    counts: IndexMap<String, u32>,
    max_count: u32,
}

impl QueryTermStats {
    pub fn new<Q: AsRef<str>>(query: &[Q]) -> Self {
        let mut counts: IndexMap<String, u32> = IndexMap::new();
        for word in query {
            let word: &str = word.as_ref();
            if word.is_empty() {
                continue;
            }
            *counts.entry(word.to_string()).or_insert(0) += 1;
        }
        let max_count = counts.values().copied().max().unwrap_or(0);
        Self { counts, max_count }
    }

    pub fn count(&self, word: &str) -> u32 {
        self.counts.get(word).copied().unwrap_or(0)
    }

    /// `count(word) / max count of any query word`, or `None` if the word is not in the query.
    pub fn max_normalized_frequency(&self, word: &str) -> Option<f64> {
        let count = *self.counts.get(word)?;
        Some(count as f64 / self.max_count as f64)
    }

    /// tf-idf weight of a query word: `max_normalized_frequency * ln(corpus_size / document_frequency)`.
    pub fn weight(&self, word: &str, corpus_size: u32, document_frequency: usize) -> Result<f64, RankError> {
        let tf = self
            .max_normalized_frequency(word)
            .ok_or_else(|| RankError::NotInQuery(word.to_string()))?;
        if document_frequency == 0 {
            return Err(RankError::UnknownTerm(word.to_string()));
        }
        if corpus_size == 0 {
            return Err(RankError::InvalidCorpusSize);
        }
        let idf = (corpus_size as f64 / document_frequency as f64).ln();
        Ok(tf * idf)
    }

    pub fn words(&self) -> impl Iterator<Item = &str> + '_ {
        self.counts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_normalizes() {
        let stats = QueryTermStats::new(&["cat", "dog", "cat", "cat", "fish", "dog"]);
        assert_eq!(stats.len(), 3);
        assert_eq!(stats.count("cat"), 3);
        assert_eq!(stats.count("bird"), 0);
        assert_eq!(stats.max_normalized_frequency("cat"), Some(1.0));
        assert_eq!(stats.max_normalized_frequency("fish"), Some(1.0 / 3.0));
        assert_eq!(stats.max_normalized_frequency("bird"), None);
    }

    #[test]
    fn keeps_first_appearance_order() {
        let stats = QueryTermStats::new(&["b", "a", "b", "c", "a"]);
        let words: Vec<&str> = stats.words().collect();
        assert_eq!(words, vec!["b", "a", "c"]);
    }

    #[test]
    fn skips_empty_words() {
        let stats = QueryTermStats::new(&["", "cat", ""]);
        assert_eq!(stats.len(), 1);
        assert!(QueryTermStats::new::<&str>(&[]).is_empty());
    }

    #[test]
    fn weight_is_tf_times_idf() {
        let stats = QueryTermStats::new(&["cat"]);
        let w = stats.weight("cat", 10, 2).unwrap();
        assert!((w - 5f64.ln()).abs() < 1e-12);

        let stats = QueryTermStats::new(&["cat", "cat", "dog"]);
        let w = stats.weight("dog", 100, 10).unwrap();
        assert!((w - 0.5 * 10f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn zero_document_frequency_is_explicit() {
        let stats = QueryTermStats::new(&["cat"]);
        assert!(matches!(stats.weight("cat", 10, 0), Err(RankError::UnknownTerm(w)) if w == "cat"));
        assert!(matches!(stats.weight("dog", 10, 3), Err(RankError::NotInQuery(_))));
        assert!(matches!(stats.weight("cat", 0, 3), Err(RankError::InvalidCorpusSize)));
    }
}
