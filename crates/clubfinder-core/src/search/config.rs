//! Search configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::error::{SearchError, SearchResult};
use crate::{ClubFinder, EnvOverrides};

/// Main search configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Ranking behavior configuration
    #[serde(default)]
    pub search: SearchBehaviorConfig,

    /// Paths configuration
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Which embedding provider backs the semantic scorer
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// No provider; semantic scoring uses the term-frequency fallback
    None,
    /// Local feature-hashing embedder
    #[default]
    Hash,
    /// OpenAI-compatible embeddings endpoint
    Http,
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    /// API key (can also use EMBEDDING_API_KEY / OPENAI_API_KEY env vars)
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding dimensions
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Per-request timeout for the HTTP provider
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            api_key: None,
            api_base: default_api_base(),
            model: default_model(),
            dimensions: default_dimensions(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    /// Get API key from config or environment
    pub fn get_api_key(&self) -> SearchResult<String> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }

        std::env::var("EMBEDDING_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .map_err(|_| SearchError::Config("embedding API key is missing".into()))
    }
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_dimensions() -> usize {
    // Hash embedder width. The HTTP provider auto-detects its own.
    384
}

fn default_timeout_secs() -> u64 {
    30
}

/// How requested categories are compared against a club's labels
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CategoryMatchMode {
    /// Case-insensitive substring of the comma-joined category string.
    /// "Art" matches "Martial Arts".
    #[default]
    Substring,
    /// Case-insensitive equality with one label.
    Label,
}

/// Ranking behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchBehaviorConfig {
    /// Maximum number of results a search returns
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Page size used when a caller does not pass one
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Upper bound on requested page sizes
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    #[serde(default)]
    pub category_match: CategoryMatchMode,

    /// Retrieve only clubs matching a requested category. When off, every
    /// club is a candidate and categories only add points.
    #[serde(default = "default_true")]
    pub category_pushdown: bool,
}

impl Default for SearchBehaviorConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            category_match: CategoryMatchMode::default(),
            category_pushdown: true,
        }
    }
}

fn default_max_results() -> usize {
    30
}

fn default_true() -> bool {
    true
}

fn default_page_size() -> usize {
    20
}

fn default_max_page_size() -> usize {
    100
}

/// Paths configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// SQLite database path
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

impl PathsConfig {
    /// Get database path, using default if not specified
    pub fn get_db_path(&self) -> PathBuf {
        if let Some(ref path) = self.db_path {
            return path.clone();
        }
        SearchConfig::config_dir().join("clubs.db")
    }
}

impl SearchConfig {
    /// Load configuration from file and environment
    /// Priority: environment variables > config.toml > defaults
    pub fn load() -> SearchResult<Self> {
        let path = Self::config_path();
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_toml(content: &str) -> SearchResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| SearchError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> SearchResult<()> {
        if self.search.max_results == 0 {
            return Err(SearchError::Config("search.max_results must be positive".into()));
        }
        if self.search.default_page_size == 0 {
            return Err(SearchError::Config("search.default_page_size must be positive".into()));
        }
        Ok(())
    }

    /// Open the club store at `paths.db_path`, or `clubs.db` in the config
    /// directory when unset.
    pub fn open_store(&self) -> SearchResult<ClubFinder> {
        Ok(ClubFinder::initialize(EnvOverrides {
            base_root: None,
            db_path: Some(self.paths.get_db_path()),
        })?)
    }

    fn apply_env(&mut self) {
        if let Ok(api_base) = std::env::var("EMBEDDING_API_BASE") {
            self.embedding.api_base = api_base;
        }
        if let Ok(api_key) =
            std::env::var("EMBEDDING_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY"))
        {
            self.embedding.api_key = Some(api_key);
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Ok(db_path) = std::env::var("CLUBFINDER_DB_PATH") {
            self.paths.db_path = Some(PathBuf::from(db_path));
        }
        if let Ok(raw) = std::env::var("CLUBFINDER_MAX_RESULTS") {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => self.search.max_results = n,
                _ => log::warn!("ignoring invalid CLUBFINDER_MAX_RESULTS={raw:?}"),
            }
        }
    }

    /// Get base config directory
    fn config_dir() -> PathBuf {
        if let Ok(root) = std::env::var("CLUBFINDER_ROOT") {
            return PathBuf::from(root);
        }

        dirs::home_dir()
            .map(|h| h.join(".clubfinder"))
            .unwrap_or_else(|| PathBuf::from(".clubfinder"))
    }

    /// Get config file path (config.toml)
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}
