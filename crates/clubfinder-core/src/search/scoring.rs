//! Weighted match score

use serde::Serialize;

use super::config::CategoryMatchMode;
use super::matching::{category_matches, match_availability, AvailabilityMatch};
use super::semantic::{PreparedQuery, SemanticScorer};
use super::types::SearchQuery;
use crate::Club;

pub const NAME_POINTS: u8 = 25;
pub const SEMANTIC_POINTS: u8 = 15;
pub const CATEGORY_POINTS: u8 = 40;
pub const AVAILABILITY_POINTS: u8 = 20;
pub const MAX_SCORE: u8 = 100;

/// Per-signal points for one club
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub name: u8,
    pub semantic: u8,
    pub category: u8,
    pub availability: u8,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u8 {
        let sum = u16::from(self.name)
            + u16::from(self.semantic)
            + u16::from(self.category)
            + u16::from(self.availability);
        sum.min(u16::from(MAX_SCORE)) as u8
    }
}

/// A query normalized once and reused for every candidate
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    keywords: Option<PreparedQuery>,
    categories: Vec<String>,
    slots: Vec<String>,
}

impl CompiledQuery {
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn slots(&self) -> &[String] {
        &self.slots
    }
}

#[derive(Clone, Default)]
pub struct ScoreComposer {
    semantic: SemanticScorer,
    category_mode: CategoryMatchMode,
}

impl ScoreComposer {
    pub fn new(semantic: SemanticScorer, category_mode: CategoryMatchMode) -> Self {
        Self {
            semantic,
            category_mode,
        }
    }

    pub fn category_mode(&self) -> CategoryMatchMode {
        self.category_mode
    }

    pub fn compile(&self, query: &SearchQuery) -> CompiledQuery {
        CompiledQuery {
            keywords: query.keywords().map(|k| self.semantic.prepare(k)),
            categories: query.requested_categories(),
            slots: query.requested_slots(),
        }
    }

    /// Score one club. Never fails; degraded signals just earn fewer points.
    pub fn score(&self, query: &CompiledQuery, club: &Club) -> (ScoreBreakdown, AvailabilityMatch) {
        let mut breakdown = ScoreBreakdown::default();

        if let Some(keywords) = &query.keywords {
            if super::lexical::contains_ci(&club.name, keywords.text()) {
                breakdown.name = NAME_POINTS;
            }
            let similarity = self.semantic.score(
                keywords,
                &club.summary,
                club.summary_embedding.as_deref(),
            );
            breakdown.semantic = scale(u64::from(similarity), 100, SEMANTIC_POINTS);
        }

        if category_matches(&query.categories, &club.categories, self.category_mode) {
            breakdown.category = CATEGORY_POINTS;
        }

        let availability = match_availability(&query.slots, club);
        if availability.requested > 0 {
            breakdown.availability = scale(
                availability.matched as u64,
                availability.requested as u64,
                AVAILABILITY_POINTS,
            );
        }

        (breakdown, availability)
    }
}

/// `floor(value / out_of * points)`, with `value` capped at `out_of`.
fn scale(value: u64, out_of: u64, points: u8) -> u8 {
    if out_of == 0 {
        return 0;
    }
    let value = value.min(out_of);
    (value * u64::from(points) / out_of) as u8
}
