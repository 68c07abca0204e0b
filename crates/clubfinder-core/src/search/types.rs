//! Common types for search module

use serde::{Deserialize, Serialize};

use super::error::{SearchError, SearchResult};
use crate::Club;

/// A user's search: interest keywords plus optional filters.
///
/// Empty fields mean "no constraint", not "match nothing".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub keywords: String,
    pub categories: Vec<String>,
    /// Requested slots in `"<Day>-<TimeSlot>"` form
    pub availability: Vec<String>,
}

impl SearchQuery {
    pub fn new(keywords: impl Into<String>) -> Self {
        Self {
            keywords: keywords.into(),
            ..Default::default()
        }
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_availability<I, S>(mut self, slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.availability = slots.into_iter().map(Into::into).collect();
        self
    }

    /// Trimmed keywords, `None` when blank
    pub fn keywords(&self) -> Option<&str> {
        let trimmed = self.keywords.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Non-blank requested categories, trimmed and de-duplicated
    pub fn requested_categories(&self) -> Vec<String> {
        distinct(self.categories.iter().map(|c| c.trim()))
    }

    /// Distinct requested slot strings, malformed ones included
    pub fn requested_slots(&self) -> Vec<String> {
        distinct(self.availability.iter().map(|s| s.trim()))
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !value.is_empty() && !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}

/// Search payload as received from a transport layer
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub availability: Vec<String>,
}

impl SearchRequest {
    /// Parse a request body.
    ///
    /// A missing body (empty, whitespace or `null`) is rejected; `{}` is a
    /// valid search with no filters.
    pub fn from_json(body: &str) -> SearchResult<Self> {
        if body.trim().is_empty() {
            return Err(SearchError::InvalidRequest("request body is required".into()));
        }
        let parsed: Option<Self> = serde_json::from_str(body)
            .map_err(|e| SearchError::InvalidRequest(format!("malformed request body: {e}")))?;
        parsed.ok_or_else(|| SearchError::InvalidRequest("request body is required".into()))
    }
}

impl From<SearchRequest> for SearchQuery {
    fn from(req: SearchRequest) -> Self {
        Self {
            keywords: req.keywords,
            categories: req.categories,
            availability: req.availability,
        }
    }
}

/// A club paired with its 0-100 match score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredClub {
    #[serde(flatten)]
    pub club: Club,
    #[serde(rename = "matchScore")]
    pub match_score: u8,
}

/// One page of the unscored club listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClubPage {
    pub clubs: Vec<Club>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub page_count: usize,
}
