use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// What a [`DocumentVector`] describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "url", rename_all = "snake_case")]
pub enum VectorLabel {
    Document(String),
    Query,
}

impl fmt::Display for VectorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorLabel::Document(url) => f.write_str(url),
            VectorLabel::Query => f.write_str("<query>"),
        }
    }
}

/// Sparse term -> weight vector for the vector-space scheme.
///
/// Document vectors carry Euclidean-normalized term frequencies, the query vector carries
/// tf-idf weights. `similarity` stays `None` until computed against a reference vector and
/// orders below every computed value.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentVector {
    pub label: VectorLabel,
    pub terms: BTreeMap<String, f64>,
    pub similarity: Option<f64>,
}

impl DocumentVector {
    pub fn document(url: impl Into<String>, terms: BTreeMap<String, f64>) -> Self {
        Self { label: VectorLabel::Document(url.into()), terms, similarity: None }
    }

    pub fn query(terms: BTreeMap<String, f64>) -> Self {
        Self { label: VectorLabel::Query, terms, similarity: None }
    }

    pub fn url(&self) -> Option<&str> {
        match &self.label {
            VectorLabel::Document(url) => Some(url),
            VectorLabel::Query => None,
        }
    }

    /// Sum of weight products over the terms both vectors contain.
    ///
    /// Magnitudes are not divided out: this is the unnormalized "cosine similarity" both
    /// rankings are defined on. Vectors without shared terms score exactly 0.
    pub fn dot(&self, other: &DocumentVector) -> f64 {
        let (small, large) = if self.terms.len() <= other.terms.len() { (self, other) } else { (other, self) };
        small
            .terms
            .iter()
            .filter_map(|(term, w)| large.terms.get(term).map(|v| w * v))
            .sum()
    }

    pub fn with_similarity_to(mut self, reference: &DocumentVector) -> Self {
        self.similarity = Some(self.dot(reference));
        self
    }

    pub fn magnitude(&self) -> f64 {
        self.terms.values().map(|w| w * w).sum::<f64>().sqrt()
    }
}

/// Descending by similarity; unset similarities sort last.
pub fn compare_by_similarity(a: &DocumentVector, b: &DocumentVector) -> Ordering {
    match (a.similarity, b.similarity) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl fmt::Display for DocumentVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "url {}: similarity=", self.label)?;
        match self.similarity {
            Some(s) => write!(f, "{s:.6}")?,
            None => f.write_str("unset")?,
        }
        write!(f, "; weights={:?}", self.terms)
    }
}
