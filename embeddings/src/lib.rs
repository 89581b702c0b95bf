//! # Embeddings
//!
//! This crate provides text embeddings and nearest-neighbor search for the
//! FAQ retrieval engine.
//!
//! ## Features
//!
//! - **Embedding Generation**: Convert text to fixed-dimension vectors
//! - **Similarity Primitives**: Cosine similarity and euclidean distance
//! - **Vector Index**: k-nearest-neighbor search with a consistency contract
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  TextEmbedder ──► Embedding ──► VectorIndex                     │
//! │       │                             │                           │
//! │       ▼                             ▼                           │
//! │  HashEmbedder            sealed + growing segments              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod index;
pub mod provider;
pub mod similarity;

pub use error::{EmbeddingError, Result};
pub use index::{Consistency, IndexConfig, IndexStats, VectorIndex, VectorRecord};
pub use provider::{HashEmbedder, TextEmbedder};
pub use similarity::{Neighbor, cosine_similarity, euclidean_distance, find_top_k};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Identifier of a document owning vectors.
pub type DocumentId = u64;

/// Identifier assigned to a stored vector.
pub type VectorId = u64;

/// Default embedding dimension.
pub const DEFAULT_DIMENSION: usize = 768;
