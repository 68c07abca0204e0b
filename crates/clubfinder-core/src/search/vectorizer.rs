//! Batch job that caches summary embeddings on club rows

use std::time::Instant;

use super::embedding::{encode_embedding, EmbeddingProvider};
use super::error::{SearchError, SearchResult};
use crate::ClubFinder;

/// Vectorization statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorizeStats {
    pub total_clubs: usize,
    pub vectorized: usize,
    pub errors: usize,
    /// Time elapsed in milliseconds
    pub elapsed_ms: u64,
}

/// Vectorization progress
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorizeProgress {
    pub current: usize,
    pub total: usize,
    /// Percentage complete (0-100)
    pub percent: u8,
}

pub struct Vectorizer<'a> {
    store: &'a ClubFinder,
    provider: &'a dyn EmbeddingProvider,
}

impl<'a> Vectorizer<'a> {
    pub fn new(store: &'a ClubFinder, provider: &'a dyn EmbeddingProvider) -> Self {
        Self { store, provider }
    }

    pub fn run(&self) -> SearchResult<VectorizeStats> {
        self.run_with_progress(|_| {})
    }

    /// Encode every club summary and store it on the row.
    ///
    /// A club that fails to encode is counted and skipped; store errors abort.
    pub fn run_with_progress<F>(&self, mut on_progress: F) -> SearchResult<VectorizeStats>
    where
        F: FnMut(VectorizeProgress),
    {
        if !self.provider.available() {
            return Err(SearchError::EmbeddingUnavailable);
        }

        let start = Instant::now();
        let clubs = self.store.list_clubs()?;
        let total = clubs.len();
        let mut stats = VectorizeStats {
            total_clubs: total,
            ..Default::default()
        };
        log::info!("vectorizing {total} club summaries");

        for (i, club) in clubs.iter().enumerate() {
            match self.provider.encode(&club.summary) {
                Ok(vector) => {
                    self.store
                        .set_summary_embedding(club.id, &encode_embedding(&vector))?;
                    stats.vectorized += 1;
                }
                Err(e) => {
                    log::warn!("failed to vectorize club {:?}: {e}", club.name);
                    stats.errors += 1;
                }
            }

            let current = i + 1;
            if current % 100 == 0 {
                log::info!("processed {current}/{total} clubs");
            }
            on_progress(VectorizeProgress {
                current,
                total,
                percent: (current * 100 / total) as u8,
            });
        }

        stats.elapsed_ms = start.elapsed().as_millis() as u64;
        log::info!(
            "vectorized {}/{} clubs ({} errors) in {}ms",
            stats.vectorized,
            total,
            stats.errors,
            stats.elapsed_ms
        );
        Ok(stats)
    }
}
