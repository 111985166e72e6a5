//! Query ranking over a [`PostingStore`].
//!
//! Two independent schemes are offered:
//!
//! * [`RankingEngine::rank_documents`] sums `query weight * euclidean tf` per document.
//! * [`RankingEngine::lookup_documents`] builds sparse document vectors and scores them against
//!   a tf-idf query vector with an unnormalized dot product.
//!
//! In both, the document frequency of a word is the number of postings retrieved for it, not
//! a global corpus statistic. Words without postings are skipped and reported in
//! [`Ranking::unknown_words`]; words whose lookup failed are reported in
//! [`Ranking::failed_words`] and the query is served from the remaining words.

use crate::error::RankError;
use crate::posting::Posting;
use crate::query::QueryTermStats;
use crate::score::{compare_by_rank, DocumentScore};
use crate::store::PostingStore;
use crate::vector::{compare_by_similarity, DocumentVector};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

pub const DEFAULT_CORPUS_SIZE: u32 = 4000;

#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfig {
    /// Overrides the corpus size reported by the store.
    pub corpus_size: Option<u32>,
}

/// Ranked hits of one query plus the words that could not contribute.
#[derive(Debug, Clone, Serialize)]
pub struct Ranking<T> {
    pub hits: Vec<T>,
    /// Query words with no postings in the index.
    pub unknown_words: Vec<String>,
    /// Query words whose retrieval failed.
    pub failed_words: Vec<String>,
}

impl<T> Ranking<T> {
    fn empty() -> Self {
        Self { hits: Vec::new(), unknown_words: Vec::new(), failed_words: Vec::new() }
    }

    /// True when at least one word could not be retrieved.
    pub fn is_partial(&self) -> bool {
        !self.failed_words.is_empty()
    }

    pub fn top(&self, k: usize) -> &[T] {
        &self.hits[..k.min(self.hits.len())]
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn into_hits(self) -> Vec<T> {
        self.hits
    }
}

/// Postings of every retrievable query word, in query order.
struct Retrieved {
    words: Vec<(String, Vec<Posting>)>,
    failed_words: Vec<String>,
}

pub struct RankingEngine<S> {
    store: S,
    corpus_size: u32,
}

impl<S: PostingStore> RankingEngine<S> {
    /// Resolve the corpus size once: configured value, else the store's count, else
    /// [`DEFAULT_CORPUS_SIZE`].
    pub fn new(store: S, config: &EngineConfig) -> Result<Self, RankError> {
        let corpus_size = match config.corpus_size {
            Some(n) => n,
            None => store.corpus_size()?.unwrap_or(DEFAULT_CORPUS_SIZE),
        };
        if corpus_size == 0 {
            return Err(RankError::InvalidCorpusSize);
        }
        tracing::debug!(corpus_size, "ranking engine ready");
        Ok(Self { store, corpus_size })
    }

    pub fn corpus_size(&self) -> u32 {
        self.corpus_size
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch postings for every distinct word in parallel; the caller folds the result.
    fn retrieve(&self, stats: &QueryTermStats) -> Retrieved {
        let words: Vec<&str> = stats.words().collect();
        let fetched: Vec<(&str, Result<Vec<Posting>, _>)> =
            words.par_iter().map(|&w| (w, self.store.lookup(w))).collect();

        let mut retrieved = Retrieved { words: Vec::with_capacity(fetched.len()), failed_words: Vec::new() };
        for (word, result) in fetched {
            match result {
                Ok(postings) => {
                    tracing::info!(word, documents = postings.len(), "retrieved postings for query word");
                    retrieved.words.push((word.to_string(), postings));
                }
                Err(e) => {
                    tracing::warn!(word, error = %e, "posting retrieval failed, continuing without word");
                    retrieved.failed_words.push(word.to_string());
                }
            }
        }
        retrieved
    }

    /// Additive scheme: each document's rank is the sum over matching query words of
    /// `weight(word) * euclidean_tf`.
    pub fn rank_documents<Q: AsRef<str>>(&self, query: &[Q]) -> Ranking<DocumentScore> {
        let stats = QueryTermStats::new(query);
        if stats.is_empty() {
            return Ranking::empty();
        }
        let retrieved = self.retrieve(&stats);

        let mut unknown_words = Vec::new();
        let mut scores: IndexMap<String, DocumentScore> = IndexMap::new();
        for (word, postings) in &retrieved.words {
            let query_weight = match self.query_weight(&stats, word, postings.len()) {
                Some(w) => w,
                None => {
                    unknown_words.push(word.clone());
                    continue;
                }
            };
            for p in postings {
                scores
                    .entry(p.url.clone())
                    .and_modify(|existing| existing.add_features(p))
                    .or_insert_with(|| DocumentScore::from_posting(p))
                    .add_evidence(query_weight * p.euclidean_tf);
            }
        }

        let mut hits: Vec<DocumentScore> = scores.into_values().collect();
        hits.sort_by(compare_by_rank);
        Ranking { hits, unknown_words, failed_words: retrieved.failed_words }
    }

    /// Vector-space scheme: documents are scored by the dot product of their
    /// euclidean-tf vector with the tf-idf query vector.
    pub fn lookup_documents<Q: AsRef<str>>(&self, query: &[Q]) -> Ranking<DocumentVector> {
        let stats = QueryTermStats::new(query);
        if stats.is_empty() {
            return Ranking::empty();
        }
        let retrieved = self.retrieve(&stats);

        let mut unknown_words = Vec::new();
        let mut query_terms: BTreeMap<String, f64> = BTreeMap::new();
        let mut documents: IndexMap<&str, BTreeMap<String, f64>> = IndexMap::new();
        for (word, postings) in &retrieved.words {
            match self.query_weight(&stats, word, postings.len()) {
                Some(w) => {
                    query_terms.insert(word.clone(), w);
                }
                None => unknown_words.push(word.clone()),
            }
            for p in postings {
                documents.entry(p.url.as_str()).or_default().insert(p.word.clone(), p.euclidean_tf);
            }
        }

        let query_vector = DocumentVector::query(query_terms);
        let mut hits: Vec<DocumentVector> = documents
            .into_iter()
            .map(|(url, terms)| DocumentVector::document(url, terms).with_similarity_to(&query_vector))
            .collect();
        hits.sort_by(compare_by_similarity);
        Ranking { hits, unknown_words, failed_words: retrieved.failed_words }
    }

    /// Query-side weight of `word`, or `None` when the word has no postings.
    fn query_weight(&self, stats: &QueryTermStats, word: &str, document_frequency: usize) -> Option<f64> {
        match stats.weight(word, self.corpus_size, document_frequency) {
            Ok(w) => Some(w),
            Err(RankError::UnknownTerm(_)) => {
                tracing::debug!(word, "query word not in corpus, weighting it zero");
                None
            }
            Err(e) => {
                tracing::warn!(word, error = %e, "cannot weight query word");
                None
            }
        }
    }
}
