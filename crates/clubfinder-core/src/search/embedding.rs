//! Embedding providers and the stored-vector codec

use std::sync::Arc;

use once_cell::sync::OnceCell;

use super::config::{EmbeddingConfig, ProviderKind};
use super::error::{SearchError, SearchResult};
use super::lexical;

/// Turns text into fixed-length vectors.
///
/// Shared across threads; `encode` may be called concurrently.
pub trait EmbeddingProvider: Send + Sync {
    /// Whether `encode` can be expected to succeed at all
    fn available(&self) -> bool;

    /// Vector length produced by `encode`
    fn dimensions(&self) -> usize;

    fn encode(&self, text: &str) -> SearchResult<Vec<f32>>;
}

/// Serialize a vector as raw little-endian f32 values.
pub fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Inverse of [`encode_embedding`].
pub fn decode_embedding(bytes: &[u8]) -> SearchResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(SearchError::InvalidEmbedding(format!(
            "byte length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Cosine similarity in `[-1, 1]`, or `None` when undefined
/// (length mismatch, empty or zero vectors, non-finite values).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    let cos = dot / (norm_a * norm_b);
    cos.is_finite().then(|| cos.clamp(-1.0, 1.0))
}

/// Deterministic feature-hashing embedder.
///
/// Each unigram and bigram is hashed with FNV-1a into one signed bucket and
/// the result is L2-normalized. No model files, always available.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dim: 384 }
    }
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn available(&self) -> bool {
        true
    }

    fn dimensions(&self) -> usize {
        self.dim
    }

    fn encode(&self, text: &str) -> SearchResult<Vec<f32>> {
        let terms = lexical::terms(text);
        if terms.is_empty() {
            return Err(SearchError::Embedding("text has no indexable terms".into()));
        }
        let mut vector = vec![0.0f32; self.dim];
        for term in &terms {
            let hash = fnv1a(term.as_bytes());
            let bucket = (hash % self.dim as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        Ok(vector)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

#[cfg(feature = "remote-embeddings")]
pub use remote::HttpEmbeddingProvider;

#[cfg(feature = "remote-embeddings")]
mod remote {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use reqwest::blocking::Client;
    use serde::{Deserialize, Serialize};

    use super::EmbeddingProvider;
    use crate::search::config::EmbeddingConfig;
    use crate::search::error::{SearchError, SearchResult};

    /// OpenAI-compatible `/embeddings` client
    pub struct HttpEmbeddingProvider {
        config: EmbeddingConfig,
        client: Client,
        api_key: Option<String>,
        /// Dimensions seen in the first response (0 = not yet detected)
        actual_dimensions: AtomicUsize,
    }

    #[derive(Debug, Serialize)]
    struct EmbeddingRequest<'a> {
        model: &'a str,
        input: Vec<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        dimensions: Option<usize>,
    }

    #[derive(Debug, Deserialize)]
    struct EmbeddingResponse {
        data: Vec<EmbeddingData>,
    }

    #[derive(Debug, Deserialize)]
    struct EmbeddingData {
        embedding: Vec<f32>,
    }

    #[derive(Debug, Deserialize)]
    struct ErrorResponse {
        error: ErrorDetail,
    }

    #[derive(Debug, Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    impl HttpEmbeddingProvider {
        pub fn new(config: EmbeddingConfig) -> SearchResult<Self> {
            let api_key = config.get_api_key().ok();
            let client = Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?;

            Ok(Self {
                config,
                client,
                api_key,
                actual_dimensions: AtomicUsize::new(0),
            })
        }
    }

    impl EmbeddingProvider for HttpEmbeddingProvider {
        fn available(&self) -> bool {
            self.api_key.is_some()
        }

        fn dimensions(&self) -> usize {
            match self.actual_dimensions.load(Ordering::Relaxed) {
                0 => self.config.dimensions,
                actual => actual,
            }
        }

        fn encode(&self, text: &str) -> SearchResult<Vec<f32>> {
            let api_key = self
                .api_key
                .as_deref()
                .ok_or(SearchError::EmbeddingUnavailable)?;
            if text.trim().is_empty() {
                return Err(SearchError::Embedding("cannot embed empty text".into()));
            }

            // Only text-embedding-3 models accept a dimensions parameter
            let dimensions = self
                .config
                .model
                .starts_with("text-embedding-3")
                .then_some(self.config.dimensions);
            let request = EmbeddingRequest {
                model: &self.config.model,
                input: vec![text],
                dimensions,
            };

            let response = self
                .client
                .post(format!("{}/embeddings", self.config.api_base))
                .bearer_auth(api_key)
                .json(&request)
                .send()?;
            let status = response.status();
            let body = response.text()?;

            if !status.is_success() {
                if let Ok(err) = serde_json::from_str::<ErrorResponse>(&body) {
                    return Err(SearchError::Embedding(err.error.message));
                }
                return Err(SearchError::Embedding(format!("API error ({status}): {body}")));
            }

            let response: EmbeddingResponse = serde_json::from_str(&body)?;
            let embedding = response
                .data
                .into_iter()
                .next()
                .map(|d| d.embedding)
                .ok_or_else(|| SearchError::Embedding("no embedding returned".into()))?;

            let detected = embedding.len();
            match self.actual_dimensions.load(Ordering::Relaxed) {
                0 => {
                    self.actual_dimensions.store(detected, Ordering::Relaxed);
                    log::info!("auto-detected embedding dimensions: {detected}");
                }
                current if current != detected => {
                    log::warn!("embedding dimension mismatch: expected {current}, got {detected}");
                }
                _ => {}
            }

            Ok(embedding)
        }
    }
}

/// Build a provider for `config`. `Ok(None)` means semantic scoring runs
/// without embeddings.
pub fn build_provider(config: &EmbeddingConfig) -> SearchResult<Option<Arc<dyn EmbeddingProvider>>> {
    match config.provider {
        ProviderKind::None => Ok(None),
        ProviderKind::Hash => Ok(Some(Arc::new(HashEmbedder::new(config.dimensions)))),
        #[cfg(feature = "remote-embeddings")]
        ProviderKind::Http => Ok(Some(Arc::new(HttpEmbeddingProvider::new(config.clone())?))),
        #[cfg(not(feature = "remote-embeddings"))]
        ProviderKind::Http => Err(SearchError::Config(
            "http embeddings require the remote-embeddings feature".into(),
        )),
    }
}

static SHARED_PROVIDER: OnceCell<Option<Arc<dyn EmbeddingProvider>>> = OnceCell::new();

/// Process-wide provider, built on first call and reused afterwards.
///
/// Later calls ignore `config`. Build failures are logged and leave the
/// process without a provider.
pub fn shared_provider(config: &EmbeddingConfig) -> Option<Arc<dyn EmbeddingProvider>> {
    SHARED_PROVIDER
        .get_or_init(|| match build_provider(config) {
            Ok(provider) => provider,
            Err(e) => {
                log::warn!("embedding provider unavailable: {e}");
                None
            }
        })
        .clone()
}
