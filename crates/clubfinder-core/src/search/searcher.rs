//! Search orchestration: retrieve, score, filter, rank

use std::sync::Arc;

use super::config::{CategoryMatchMode, SearchBehaviorConfig, SearchConfig};
use super::embedding::EmbeddingProvider;
use super::error::{SearchError, SearchResult};
use super::matching::category_matches;
use super::scoring::{CompiledQuery, ScoreBreakdown, ScoreComposer};
use super::semantic::SemanticScorer;
use super::store::RecordStore;
use super::types::{ClubPage, ScoredClub, SearchQuery, SearchRequest};
use crate::Club;

/// Ranks clubs from a [`RecordStore`] against user queries.
///
/// Holds no per-query state, so one instance can serve concurrent searches.
pub struct Searcher<S> {
    store: S,
    composer: ScoreComposer,
    behavior: SearchBehaviorConfig,
}

impl<S: RecordStore> Searcher<S> {
    pub fn new(store: S, config: &SearchConfig, provider: Option<Arc<dyn EmbeddingProvider>>) -> Self {
        if !provider.as_ref().is_some_and(|p| p.available()) {
            log::info!("no embedding provider available; semantic scoring uses term overlap");
        }
        let composer = ScoreComposer::new(
            SemanticScorer::new(provider),
            config.search.category_match,
        );
        Self::with_composer(store, composer, config.search.clone())
    }

    pub fn with_composer(store: S, composer: ScoreComposer, behavior: SearchBehaviorConfig) -> Self {
        Self {
            store,
            composer,
            behavior,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Ranked clubs for `query`, best first, at most `max_results`.
    ///
    /// Only store failures are errors; scoring problems lower a club's score.
    pub fn search(&self, query: &SearchQuery) -> SearchResult<Vec<ScoredClub>> {
        let compiled = self.composer.compile(query);
        let candidates = self.candidates(&compiled)?;
        let candidate_count = candidates.len();

        let mut results: Vec<ScoredClub> = candidates
            .into_iter()
            .filter_map(|club| {
                let (breakdown, availability) = self.composer.score(&compiled, &club);
                if !compiled.slots().is_empty() && !availability.any() {
                    return None;
                }
                Some(ScoredClub {
                    match_score: breakdown.total(),
                    club,
                })
            })
            .collect();

        // Stable: equal scores keep retrieval order.
        results.sort_by(|a, b| b.match_score.cmp(&a.match_score));
        results.truncate(self.behavior.max_results);

        log::debug!(
            "search {:?}: {} candidates, {} results",
            query.keywords,
            candidate_count,
            results.len()
        );
        Ok(results)
    }

    /// Parse a raw request body and search with it.
    pub fn search_request(&self, body: &str) -> SearchResult<Vec<ScoredClub>> {
        let request = SearchRequest::from_json(body)?;
        self.search(&request.into())
    }

    /// Per-signal scores of one club for `query`, without filtering.
    pub fn explain(&self, query: &SearchQuery, club: &Club) -> ScoreBreakdown {
        let compiled = self.composer.compile(query);
        self.composer.score(&compiled, club).0
    }

    fn candidates(&self, query: &CompiledQuery) -> SearchResult<Vec<Club>> {
        let categories = query.categories();
        if categories.is_empty() || !self.behavior.category_pushdown {
            return Ok(self.store.fetch_all()?);
        }
        let clubs = self.store.fetch_by_categories(categories)?;
        Ok(match self.composer.category_mode() {
            CategoryMatchMode::Substring => clubs,
            CategoryMatchMode::Label => clubs
                .into_iter()
                .filter(|c| category_matches(categories, &c.categories, CategoryMatchMode::Label))
                .collect(),
        })
    }

    /// Unscored listing, one-based `page`. `page_size` defaults to the
    /// configured size and is capped at `max_page_size`.
    pub fn get_all_paged(&self, page: usize, page_size: Option<usize>) -> SearchResult<ClubPage> {
        if page == 0 {
            return Err(SearchError::InvalidRequest("page numbers start at 1".into()));
        }
        let page_size = page_size.unwrap_or(self.behavior.default_page_size);
        if page_size == 0 {
            return Err(SearchError::InvalidRequest("page size must be positive".into()));
        }
        let page_size = page_size.min(self.behavior.max_page_size.max(1));

        let total = self.store.count()?;
        let page_count = total.div_ceil(page_size);
        let offset = (page - 1).saturating_mul(page_size);
        let clubs = if offset >= total {
            Vec::new()
        } else {
            self.store.fetch_page(offset, page_size)?
        };

        Ok(ClubPage {
            clubs,
            total,
            page,
            page_size,
            page_count,
        })
    }

    /// `Ok(None)` when no club has `id`.
    pub fn get_by_id(&self, id: i64) -> SearchResult<Option<Club>> {
        Ok(self.store.fetch_by_id(id)?)
    }
}
