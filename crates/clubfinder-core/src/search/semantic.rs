//! Semantic similarity between a query and a club summary
//!
//! Three tiers, tried in order:
//!
//! 1. Embedding cosine, when a provider is present and available. The text
//!    vector comes from the club's cached embedding or is encoded on the fly.
//! 2. Term-frequency cosine over stop-word-filtered unigrams and bigrams,
//!    when there is no usable provider.
//! 3. Plain substring match (50 or 0) when a tier above fails.
//!
//! Every path yields a score in `0..=100`.

use std::collections::HashMap;
use std::sync::Arc;

use super::embedding::{cosine_similarity, decode_embedding, EmbeddingProvider};
use super::lexical;

/// Score given by the substring fallback when the query appears in the text
pub const SUBSTRING_MATCH_SCORE: u8 = 50;

/// A query with its embedding computed once per search
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    text: String,
    vector: Option<Vec<f32>>,
}

impl PreparedQuery {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn has_vector(&self) -> bool {
        self.vector.is_some()
    }
}

#[derive(Clone, Default)]
pub struct SemanticScorer {
    provider: Option<Arc<dyn EmbeddingProvider>>,
}

impl SemanticScorer {
    pub fn new(provider: Option<Arc<dyn EmbeddingProvider>>) -> Self {
        Self { provider }
    }

    /// Scorer that always uses the term-frequency path
    pub fn without_embeddings() -> Self {
        Self { provider: None }
    }

    fn active_provider(&self) -> Option<&dyn EmbeddingProvider> {
        self.provider.as_deref().filter(|p| p.available())
    }

    pub fn has_embeddings(&self) -> bool {
        self.active_provider().is_some()
    }

    pub fn prepare(&self, query: &str) -> PreparedQuery {
        let text = query.trim().to_string();
        let vector = match self.active_provider() {
            Some(provider) if !text.is_empty() => match provider.encode(&text) {
                Ok(vector) => Some(vector),
                Err(e) => {
                    log::debug!("query embedding failed, using substring fallback: {e}");
                    None
                }
            },
            _ => None,
        };
        PreparedQuery { text, vector }
    }

    /// One-shot similarity of `query` to `text` in `0..=100`.
    pub fn similarity(&self, query: &str, text: &str, cached_embedding: Option<&[u8]>) -> u8 {
        self.score(&self.prepare(query), text, cached_embedding)
    }

    pub fn score(&self, query: &PreparedQuery, text: &str, cached_embedding: Option<&[u8]>) -> u8 {
        if query.text.is_empty() {
            return 0;
        }
        if text.trim().is_empty() {
            return substring_score(&query.text, text);
        }

        match self.active_provider() {
            Some(provider) => {
                let Some(query_vector) = query.vector.as_deref() else {
                    return substring_score(&query.text, text);
                };
                self.text_vector(provider, text, cached_embedding, query_vector.len())
                    .and_then(|text_vector| cosine_similarity(query_vector, &text_vector))
                    .map(cosine_to_score)
                    .unwrap_or_else(|| substring_score(&query.text, text))
            }
            None => term_frequency_score(&query.text, text)
                .unwrap_or_else(|| substring_score(&query.text, text)),
        }
    }

    fn text_vector(
        &self,
        provider: &dyn EmbeddingProvider,
        text: &str,
        cached: Option<&[u8]>,
        expected_len: usize,
    ) -> Option<Vec<f32>> {
        if let Some(bytes) = cached {
            match decode_embedding(bytes) {
                Ok(vector) if vector.len() == expected_len => return Some(vector),
                Ok(vector) => log::debug!(
                    "cached embedding has {} dimensions, expected {expected_len}; re-encoding",
                    vector.len()
                ),
                Err(e) => log::debug!("ignoring cached embedding: {e}"),
            }
        }
        match provider.encode(text) {
            Ok(vector) => Some(vector),
            Err(e) => {
                log::debug!("summary embedding failed, using substring fallback: {e}");
                None
            }
        }
    }
}

/// Map a cosine in `[-1, 1]` onto `0..=100`.
pub fn cosine_to_score(cos: f32) -> u8 {
    (((cos + 1.0) / 2.0) * 100.0).round().clamp(0.0, 100.0) as u8
}

fn substring_score(query: &str, text: &str) -> u8 {
    if lexical::contains_ci(text, query) {
        SUBSTRING_MATCH_SCORE
    } else {
        0
    }
}

/// Cosine of raw term-frequency vectors; `None` when either side has no terms.
fn term_frequency_score(query: &str, text: &str) -> Option<u8> {
    let q = term_counts(query);
    let t = term_counts(text);
    if q.is_empty() || t.is_empty() {
        return None;
    }
    let dot: f32 = q
        .iter()
        .filter_map(|(term, qc)| t.get(term).map(|tc| qc * tc))
        .sum();
    let norm = |m: &HashMap<String, f32>| m.values().map(|v| v * v).sum::<f32>().sqrt();
    let cos = dot / (norm(&q) * norm(&t));
    Some((cos * 100.0).round().clamp(0.0, 100.0) as u8)
}

fn term_counts(text: &str) -> HashMap<String, f32> {
    let mut counts = HashMap::new();
    for term in lexical::terms(text) {
        *counts.entry(term).or_insert(0.0) += 1.0;
    }
    counts
}
