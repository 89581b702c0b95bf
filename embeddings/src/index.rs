//! Nearest-neighbor vector index.
//!
//! Records live in one of two segments. New records land in the *growing*
//! segment and move to the *sealed* segment once enough of them accumulate
//! or [`VectorIndex::flush`] is called. [`Consistency::Strong`] searches scan
//! both segments; [`Consistency::Eventual`] scans only sealed records and may
//! miss very recent inserts. Deletes drop records from both segments before
//! returning, so no search ever reports a document deleted before it began.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{EmbeddingError, Result};
use crate::similarity::{Neighbor, find_top_k};
use crate::{DEFAULT_DIMENSION, DocumentId, Embedding, VectorId};

/// Read consistency requested by a search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    /// Observe every write that returned before the search was issued.
    #[default]
    Strong,
    /// Observe sealed writes only.
    Eventual,
}

/// Configuration for a [`VectorIndex`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Length of every stored vector.
    pub dimension: usize,

    /// Buffered inserts before the growing segment is sealed.
    pub seal_threshold: usize,

    /// Deadline for each index operation, in milliseconds.
    pub operation_timeout_ms: u64,
}

impl IndexConfig {
    /// Create a configuration for vectors of `dimension` components.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ..Self::default()
        }
    }

    /// Set the seal threshold.
    pub fn with_seal_threshold(mut self, threshold: usize) -> Self {
        self.seal_threshold = threshold;
        self
    }

    /// Set the per-operation timeout.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            seal_threshold: 1024,
            operation_timeout_ms: 5_000,
        }
    }
}

/// One stored embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Identifier assigned by the index on insert.
    pub vector_id: VectorId,

    /// Owning document.
    pub document_id: DocumentId,

    /// The embedding vector.
    pub vector: Embedding,
}

/// Counts describing the current index contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Records visible to eventual searches.
    pub sealed: usize,

    /// Records visible only to strong searches.
    pub growing: usize,

    /// Distinct documents with at least one record.
    pub documents: usize,
}

#[derive(Default)]
struct IndexState {
    open: bool,
    sealed: HashMap<VectorId, VectorRecord>,
    growing: HashMap<VectorId, VectorRecord>,
    by_document: HashMap<DocumentId, Vec<VectorId>>,
}

impl IndexState {
    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(EmbeddingError::IndexUnavailable(
                "index is closed".to_string(),
            ))
        }
    }

    fn seal(&mut self) -> usize {
        let count = self.growing.len();
        self.sealed.extend(self.growing.drain());
        count
    }
}

/// A vector index keyed by document id.
///
/// All operations take `&self` and are safe to call concurrently. Each one
/// is bounded by the configured operation timeout and fails with
/// [`EmbeddingError::Timeout`] instead of waiting indefinitely.
pub struct VectorIndex {
    config: IndexConfig,
    state: RwLock<IndexState>,
    next_vector_id: AtomicU64,
}

impl VectorIndex {
    /// Open a new, empty index.
    pub fn open(config: IndexConfig) -> Result<Self> {
        if config.dimension == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "index dimension must be positive".to_string(),
            ));
        }
        if config.seal_threshold == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "seal threshold must be positive".to_string(),
            ));
        }

        info!("Opened vector index with dimension {}", config.dimension);
        Ok(Self {
            config,
            state: RwLock::new(IndexState {
                open: true,
                ..IndexState::default()
            }),
            next_vector_id: AtomicU64::new(1),
        })
    }

    /// Close the index and release every record.
    ///
    /// Later calls fail with [`EmbeddingError::IndexUnavailable`].
    pub async fn close(&self) {
        let mut state = self.state.write().await;
        if state.open {
            *state = IndexState::default();
            info!("Closed vector index");
        }
    }

    /// Whether the index accepts operations.
    pub async fn is_open(&self) -> bool {
        self.state.read().await.open
    }

    /// Expected dimension of stored vectors.
    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.config.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.config.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    async fn bounded<T, F>(&self, operation: &'static str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.config.operation_timeout(), future).await {
            Ok(result) => result,
            Err(_) => Err(EmbeddingError::Timeout {
                operation,
                timeout_ms: self.config.operation_timeout_ms,
            }),
        }
    }

    /// Insert a new vector for `document_id` and return its vector id.
    ///
    /// Existing records of the same document are left in place; callers
    /// replacing an embedding delete the old one first.
    pub async fn upsert(&self, document_id: DocumentId, vector: Embedding) -> Result<VectorId> {
        self.check_dimension(&vector)?;

        self.bounded("upsert", async {
            let mut state = self.state.write().await;
            state.ensure_open()?;

            let vector_id = self.next_vector_id.fetch_add(1, Ordering::Relaxed);
            state.growing.insert(
                vector_id,
                VectorRecord {
                    vector_id,
                    document_id,
                    vector,
                },
            );
            state.by_document.entry(document_id).or_default().push(vector_id);
            debug!("Added vector {vector_id} for document {document_id}");

            if state.growing.len() >= self.config.seal_threshold {
                let sealed = state.seal();
                debug!("Sealed {sealed} vectors");
            }

            Ok(vector_id)
        })
        .await
    }

    /// Remove every vector owned by `document_id`. Returns how many were removed.
    pub async fn delete_by_document(&self, document_id: DocumentId) -> Result<usize> {
        self.bounded("delete", async {
            let mut state = self.state.write().await;
            state.ensure_open()?;

            let Some(vector_ids) = state.by_document.remove(&document_id) else {
                return Ok(0);
            };
            for vector_id in &vector_ids {
                if state.growing.remove(vector_id).is_none() {
                    state.sealed.remove(vector_id);
                }
            }
            debug!(
                "Removed {} vectors for document {document_id}",
                vector_ids.len()
            );
            Ok(vector_ids.len())
        })
        .await
    }

    /// Search for the closest documents, returning ids and distances.
    pub async fn search_scored(
        &self,
        query: &[f32],
        top_k: usize,
        consistency: Consistency,
    ) -> Result<Vec<Neighbor>> {
        self.check_dimension(query)?;

        self.bounded("search", async {
            let state = self.state.read().await;
            state.ensure_open()?;

            let sealed = state.sealed.values();
            let candidates: Box<dyn Iterator<Item = &VectorRecord> + '_> = match consistency {
                Consistency::Strong => Box::new(sealed.chain(state.growing.values())),
                Consistency::Eventual => Box::new(sealed),
            };

            find_top_k(
                query,
                candidates.map(|r| (r.document_id, r.vector.as_slice())),
                top_k,
            )
        })
        .await
    }

    /// Search for the closest documents.
    ///
    /// Returns up to `top_k` document ids by ascending euclidean distance,
    /// ties broken by the lower id.
    pub async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        consistency: Consistency,
    ) -> Result<Vec<DocumentId>> {
        let neighbors = self.search_scored(query, top_k, consistency).await?;
        Ok(neighbors.into_iter().map(|n| n.document_id).collect())
    }

    /// Seal all buffered inserts so eventual searches observe them.
    pub async fn flush(&self) -> Result<usize> {
        self.bounded("flush", async {
            let mut state = self.state.write().await;
            state.ensure_open()?;
            let sealed = state.seal();
            if sealed > 0 {
                debug!("Flushed {sealed} vectors");
            }
            Ok(sealed)
        })
        .await
    }

    /// Check whether a document has at least one vector.
    pub async fn contains_document(&self, document_id: DocumentId) -> Result<bool> {
        self.bounded("contains", async {
            let state = self.state.read().await;
            state.ensure_open()?;
            Ok(state.by_document.contains_key(&document_id))
        })
        .await
    }

    /// Get the number of stored vectors.
    pub async fn len(&self) -> Result<usize> {
        let stats = self.stats().await?;
        Ok(stats.sealed + stats.growing)
    }

    /// Check if the index holds no vectors.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Get index statistics.
    pub async fn stats(&self) -> Result<IndexStats> {
        self.bounded("stats", async {
            let state = self.state.read().await;
            state.ensure_open()?;
            Ok(IndexStats {
                sealed: state.sealed.len(),
                growing: state.growing.len(),
                documents: state.by_document.len(),
            })
        })
        .await
    }
}
