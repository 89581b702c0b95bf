//! Configuration for the retrieval engine.

use std::path::Path;

use faq_embeddings::{Consistency, DEFAULT_DIMENSION, IndexConfig};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};

/// Configuration for the retrieval engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Embedding provider configuration.
    pub embedding: EmbeddingConfig,

    /// Vector index configuration.
    pub index: IndexConfig,

    /// Query processing configuration.
    pub query: QueryConfig,
}

impl RetrievalConfig {
    /// Create a configuration where embedder and index share `dimension`.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            embedding: EmbeddingConfig {
                dimension,
                ..EmbeddingConfig::default()
            },
            index: IndexConfig::new(dimension),
            query: QueryConfig::default(),
        }
    }

    /// Set the index configuration.
    pub fn with_index(mut self, config: IndexConfig) -> Self {
        self.index = config;
        self
    }

    /// Set the query configuration.
    pub fn with_query(mut self, config: QueryConfig) -> Self {
        self.query = config;
        self
    }

    /// Parse a configuration from TOML. Missing fields take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.embedding.dimension == 0 {
            return Err(RetrievalError::Config(
                "embedding dimension must be positive".to_string(),
            ));
        }
        if self.embedding.dimension != self.index.dimension {
            return Err(RetrievalError::Config(format!(
                "embedding dimension {} does not match index dimension {}",
                self.embedding.dimension, self.index.dimension
            )));
        }
        if self.query.top_k == 0 {
            return Err(RetrievalError::Config(
                "query top_k must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the embedding provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which provider to use.
    pub provider: EmbeddingProviderType,

    /// Length of produced vectors.
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::Hash,
            dimension: DEFAULT_DIMENSION,
        }
    }
}

/// Type of embedding provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderType {
    /// Deterministic hash-seeded stand-in.
    Hash,
}

/// Configuration for query processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Number of nearest candidates fetched per query.
    pub top_k: usize,

    /// Consistency level used for query searches.
    pub consistency: Consistency,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            consistency: Consistency::Strong,
        }
    }
}
