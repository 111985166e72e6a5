pub mod engine;
pub mod error;
pub mod import;
pub mod persist;
pub mod posting;
pub mod query;
pub mod score;
pub mod store;
pub mod vector;

pub use engine::{EngineConfig, Ranking, RankingEngine, DEFAULT_CORPUS_SIZE};
pub use error::{ParseError, RankError, StoreError};
pub use posting::Posting;
pub use query::QueryTermStats;
pub use score::{DocumentScore, StructuralFeatures};
pub use store::{MemoryStore, PostingStore, SledStore};
pub use vector::{DocumentVector, VectorLabel};
