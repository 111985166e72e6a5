use crate::posting::Posting;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Structural counts summed over every posting that contributed to a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StructuralFeatures {
    pub word_count: u64,
    pub link_count: u64,
    pub meta_tag_count: u64,
    pub header_count: u64,
}

impl StructuralFeatures {
    fn add(&mut self, posting: &Posting) {
        self.word_count += u64::from(posting.word_count);
        self.link_count += u64::from(posting.link_count);
        self.meta_tag_count += u64::from(posting.meta_tag_count);
        self.header_count += u64::from(posting.header_count);
    }
}

/// Additive-scheme accumulator for one candidate document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentScore {
    pub url: String,
    pub rank: f64,
    pub features: StructuralFeatures,
    /// Number of distinct query words that hit this document.
    pub matched_words: u32,
}

impl DocumentScore {
    pub fn from_posting(posting: &Posting) -> Self {
        let mut score = Self {
            url: posting.url.clone(),
            rank: 0.0,
            features: StructuralFeatures::default(),
            matched_words: 0,
        };
        score.add_features(posting);
        score
    }

    pub fn add_features(&mut self, posting: &Posting) {
        debug_assert_eq!(posting.url, self.url);
        self.features.add(posting);
        self.matched_words += 1;
    }

    pub fn add_evidence(&mut self, weight: f64) {
        self.rank += weight;
    }
}

/// Descending by rank.
pub fn compare_by_rank(a: &DocumentScore, b: &DocumentScore) -> Ordering {
    b.rank.total_cmp(&a.rank)
}

impl fmt::Display for DocumentScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "url {}: rank={:.6}; words={} links={} metas={} headers={}",
            self.url,
            self.rank,
            self.features.word_count,
            self.features.link_count,
            self.features.meta_tag_count,
            self.features.header_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(word: &str, url: &str, words: u32, links: u32) -> Posting {
        Posting { word_count: words, link_count: links, meta_tag_count: 1, header_count: 2, ..Posting::new(word, url, 1.0, 0.5) }
    }

    #[test]
    fn accumulates_features_across_postings() {
        let mut score = DocumentScore::from_posting(&posting("cat", "a", 10, 3));
        score.add_features(&posting("dog", "a", 10, 4));
        assert_eq!(score.matched_words, 2);
        assert_eq!(score.features, StructuralFeatures { word_count: 20, link_count: 7, meta_tag_count: 2, header_count: 4 });
        assert_eq!(score.rank, 0.0);
    }

    #[test]
    fn evidence_is_additive() {
        let mut score = DocumentScore::from_posting(&posting("cat", "a", 1, 1));
        score.add_evidence(0.25);
        score.add_evidence(0.5);
        assert_eq!(score.rank, 0.75);
    }

    #[test]
    fn sorts_descending_and_keeps_ties_stable() {
        let mut scores: Vec<DocumentScore> = [("a", 0.1), ("b", 0.9), ("c", 0.1), ("d", 0.5)]
            .iter()
            .map(|(url, rank)| DocumentScore { rank: *rank, ..DocumentScore::from_posting(&posting("w", url, 0, 0)) })
            .collect();
        scores.sort_by(compare_by_rank);
        let urls: Vec<&str> = scores.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn display_lists_rank_and_features() {
        let mut score = DocumentScore::from_posting(&posting("cat", "http://a", 5, 1));
        score.add_evidence(1.5);
        assert_eq!(score.to_string(), "url http://a: rank=1.500000; words=5 links=1 metas=1 headers=2");
    }
}
