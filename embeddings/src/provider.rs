//! Text embedders.
//!
//! [`TextEmbedder`] is the seam where a real semantic model plugs in. The
//! only implementation shipped here is [`HashEmbedder`], a deterministic
//! stand-in that keeps tests and re-indexing reproducible.

use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Trait for text embedders.
///
/// Implementations must be deterministic: the same text always maps to a
/// bit-identical vector of length [`TextEmbedder::dimension`].
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Get the name of this embedder.
    fn name(&self) -> &str;

    /// Length of every vector this embedder produces.
    fn dimension(&self) -> usize;

    /// Generate an embedding for the given text.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Generate embeddings for multiple texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        // Default implementation: process sequentially
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }
}

/// Hash-seeded pseudo-random embedder.
///
/// This is **not** a semantic embedding. Each text seeds a local random
/// ChaCha8 stream from a SHA-256 digest of its bytes and draws one component
/// per dimension, uniformly in `[-1, 1)`. The ChaCha stream is fixed across
/// platforms and releases, so stored vectors stay valid after an upgrade.
/// Similar texts do not land near each other; identical texts always land
/// on the same point.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Create a new hash embedder producing vectors of `dimension` components.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "embedding dimension must be positive".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    fn seed(text: &str) -> u64 {
        let digest = Sha256::digest(text.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(bytes)
    }

    /// Synchronous form of [`TextEmbedder::embed`].
    pub fn embed_sync(&self, text: &str) -> Embedding {
        let mut rng = ChaCha8Rng::seed_from_u64(Self::seed(text));
        (0..self.dimension)
            .map(|_| (rng.random::<f32>() - 0.5) * 2.0)
            .collect()
    }
}

#[async_trait]
impl TextEmbedder for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        let embedding = self.embed_sync(text);
        debug!("Generated hash embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }
}
