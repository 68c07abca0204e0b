//! Search error types

use thiserror::Error;

use crate::CoreError;

/// Errors surfaced by the search layer.
///
/// Scoring degradations (missing embeddings, unparsable slots) are absorbed
/// where they happen and never show up here.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("store error: {0}")]
    Store(#[from] CoreError),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("embedding provider is not available")]
    EmbeddingUnavailable,

    #[error("invalid embedding: {0}")]
    InvalidEmbedding(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[cfg(feature = "remote-embeddings")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SearchResult<T> = Result<T, SearchError>;
