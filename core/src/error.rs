use thiserror::Error;

/// Failures of a posting store lookup.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(#[from] sled::Error),
    #[error("cannot encode or decode posting under '{word}': {source}")]
    Codec {
        word: String,
        #[source]
        source: bincode::Error,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while weighting query terms or setting up the engine.
#[derive(Debug, Error)]
pub enum RankError {
    /// The word has no postings, so its inverse document frequency is undefined.
    #[error("term '{0}' does not occur in the corpus")]
    UnknownTerm(String),
    #[error("term '{0}' is not part of the query")]
    NotInQuery(String),
    #[error("corpus size must be positive")]
    InvalidCorpusSize,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A tab-delimited posting record that could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected {expected} tab-separated fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("field '{field}' is not numeric: '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("field '{0}' is empty")]
    EmptyField(&'static str),
    #[error("field '{0}' contains a NUL byte")]
    NulByte(&'static str),
}
