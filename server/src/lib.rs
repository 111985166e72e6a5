pub mod errors;

use anyhow::Result;
use axum::{extract::{Path, Query, State}, routing::get, Json, Router};
use errors::ApiError;
use search_core::persist::{open_store, try_load_meta, IndexPaths};
use search_core::{DocumentScore, DocumentVector, EngineConfig, Posting, PostingStore, Ranking, RankingEngine};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    /// Overrides the corpus size from the index meta file and the store.
    pub corpus_size: Option<u32>,
    pub query_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { corpus_size: None, query_timeout: Duration::from_millis(2000) }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Additive,
    Vector,
    #[default]
    Both,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default)]
    pub scheme: Scheme,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub corpus_size: u32,
    /// True when retrieval failed for at least one word.
    pub partial: bool,
    pub unknown_words: Vec<String>,
    pub failed_words: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additive: Option<SchemeHits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<SchemeHits>,
}

#[derive(Serialize)]
pub struct SchemeHits {
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub url: String,
    pub score: f64,
}

pub struct AppState<S> {
    pub engine: Arc<RankingEngine<S>>,
    pub query_timeout: Duration,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self { engine: Arc::clone(&self.engine), query_timeout: self.query_timeout }
    }
}

pub fn build_app(index_dir: String, config: ServerConfig) -> Result<Router> {
    let index_paths = IndexPaths::new(&index_dir);
    let store = open_store(&index_paths)?;
    let corpus_size = match config.corpus_size {
        Some(n) => Some(n),
        None => try_load_meta(&index_paths)?.map(|m| m.corpus_size),
    };
    build_app_with_store(store, ServerConfig { corpus_size, ..config })
}

/// Build the router over any posting store; [`build_app`] uses the on-disk sled index.
pub fn build_app_with_store<S: PostingStore + 'static>(store: S, config: ServerConfig) -> Result<Router> {
    let engine = RankingEngine::new(store, &EngineConfig { corpus_size: config.corpus_size })?;
    tracing::info!(corpus_size = engine.corpus_size(), "index opened");
    let app_state = AppState { engine: Arc::new(engine), query_timeout: config.query_timeout };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler::<S>))
        .route("/postings/:word", get(postings_handler::<S>))
        .with_state(app_state)
        .layer(cors);
    Ok(app)
}

type Rankings = (Option<Ranking<DocumentScore>>, Option<Ranking<DocumentVector>>);

fn run_query<S: PostingStore>(engine: &RankingEngine<S>, words: &[String], scheme: Scheme) -> Rankings {
    let additive = matches!(scheme, Scheme::Additive | Scheme::Both).then(|| engine.rank_documents(words));
    let vector = matches!(scheme, Scheme::Vector | Scheme::Both).then(|| engine.lookup_documents(words));
    (additive, vector)
}

/// Run blocking store work on the blocking pool, bounded by the query timeout.
async fn with_timeout<S, T, F>(state: &AppState<S>, what: &str, work: F) -> Result<T, ApiError>
where
    S: PostingStore + 'static,
    T: Send + 'static,
    F: FnOnce(&RankingEngine<S>) -> T + Send + 'static,
{
    let engine = Arc::clone(&state.engine);
    let task = tokio::task::spawn_blocking(move || work(&engine));
    match tokio::time::timeout(state.query_timeout, task).await {
        Ok(joined) => Ok(joined?),
        Err(_) => {
            tracing::warn!(what, timeout_ms = state.query_timeout.as_millis() as u64, "query timed out");
            Err(ApiError::Timeout(format!("{what} exceeded {} ms", state.query_timeout.as_millis())))
        }
    }
}

pub async fn search_handler<S: PostingStore + 'static>(State(state): State<AppState<S>>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = Instant::now();
    // Words arrive normalized; only split on whitespace.
    let words: Vec<String> = params.q.split_whitespace().map(str::to_string).collect();
    if words.is_empty() {
        return Err(ApiError::BadRequest("query must contain at least one word".into()));
    }
    let k = params.k.clamp(1, 100);
    let scheme = params.scheme;

    let (additive, vector) = with_timeout(&state, "search", move |engine| run_query(engine, &words, scheme)).await?;

    let mut unknown_words = Vec::new();
    let mut failed_words: Vec<String> = Vec::new();
    for (unknown, failed) in [
        additive.as_ref().map(|r| (&r.unknown_words, &r.failed_words)),
        vector.as_ref().map(|r| (&r.unknown_words, &r.failed_words)),
    ]
    .into_iter()
    .flatten()
    {
        if unknown_words.is_empty() {
            unknown_words = unknown.clone();
        }
        for w in failed {
            if !failed_words.contains(w) {
                failed_words.push(w.clone());
            }
        }
    }

    let additive = additive.map(|r| SchemeHits {
        total_hits: r.len(),
        results: r.top(k).iter().map(|d| SearchHit { url: d.url.clone(), score: d.rank }).collect(),
    });
    let vector = vector.map(|r| SchemeHits {
        total_hits: r.len(),
        results: r
            .top(k)
            .iter()
            .map(|v| SearchHit { url: v.url().unwrap_or_default().to_string(), score: v.similarity.unwrap_or(0.0) })
            .collect(),
    });

    let elapsed = start.elapsed();
    tracing::info!(query = %params.q, took_ms = elapsed.as_millis() as u64, partial = !failed_words.is_empty(), "search served");
    Ok(Json(SearchResponse {
        query: params.q,
        took_s: elapsed.as_secs_f64(),
        corpus_size: state.engine.corpus_size(),
        partial: !failed_words.is_empty(),
        unknown_words,
        failed_words,
        additive,
        vector,
    }))
}

pub async fn postings_handler<S: PostingStore + 'static>(State(state): State<AppState<S>>, Path(word): Path<String>) -> Result<Json<Vec<Posting>>, ApiError> {
    let lookup_word = word.clone();
    let postings = with_timeout(&state, "postings lookup", move |engine| engine.store().lookup(&lookup_word)).await??;
    if postings.is_empty() {
        return Err(ApiError::NotFound(format!("no postings for '{word}'")));
    }
    Ok(Json(postings))
}
