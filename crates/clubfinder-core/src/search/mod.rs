//! Club search and ranking
//!
//! Matches clubs against a free-text interest query, category filters and
//! weekly availability, returning a ranked list of at most 30 clubs by
//! default.
//!
//! ## Scoring
//!
//! | Signal | Points |
//! |---|---|
//! | keywords found in the club name | 25 |
//! | semantic similarity of keywords and summary | up to 15 |
//! | a requested category matches | 40 |
//! | share of requested slots the club meets in | up to 20 |
//!
//! When availability is requested, clubs meeting in none of the requested
//! slots are dropped.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use clubfinder_core::search::{shared_provider, SearchConfig, SearchQuery, Searcher};
//!
//! let config = SearchConfig::load()?;
//! let store = config.open_store()?;
//! let searcher = Searcher::new(store, &config, shared_provider(&config.embedding));
//! let results = searcher.search(
//!     &SearchQuery::new("chess").with_availability(["Monday-Evening"]),
//! )?;
//! ```

mod config;
mod embedding;
mod error;
mod lexical;
mod matching;
mod scoring;
mod searcher;
mod semantic;
mod store;
mod types;
mod vectorizer;

#[cfg(test)]
mod tests;

pub use config::{
    CategoryMatchMode, EmbeddingConfig, PathsConfig, ProviderKind, SearchBehaviorConfig,
    SearchConfig,
};
#[cfg(feature = "remote-embeddings")]
pub use embedding::HttpEmbeddingProvider;
pub use embedding::{
    build_provider, cosine_similarity, decode_embedding, encode_embedding, shared_provider,
    EmbeddingProvider, HashEmbedder,
};
pub use error::{SearchError, SearchResult};
pub use lexical::contains_ci;
pub use matching::{category_matches, match_availability, AvailabilityMatch};
pub use scoring::{
    CompiledQuery, ScoreBreakdown, ScoreComposer, AVAILABILITY_POINTS, CATEGORY_POINTS,
    NAME_POINTS, SEMANTIC_POINTS,
};
pub use searcher::Searcher;
pub use semantic::{cosine_to_score, PreparedQuery, SemanticScorer, SUBSTRING_MATCH_SCORE};
pub use store::{MemoryStore, RecordStore};
pub use types::*;
pub use vectorizer::{VectorizeProgress, VectorizeStats, Vectorizer};
