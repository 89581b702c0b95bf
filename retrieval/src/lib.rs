//! # Retrieval Engine
//!
//! This crate answers free-text questions against a catalog of FAQ
//! documents and learns from user feedback. It combines:
//!
//! - **Document Store**: FAQ entries with view and feedback counters
//! - **Embeddings**: Query and document vectors with nearest-neighbor search
//! - **Query Log**: An audit trail of every query, correctable by feedback
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Knowledge Base                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  query ──► TextEmbedder ──► VectorIndex ──► DocumentStore       │
//! │                                                  │               │
//! │                                                  ▼               │
//! │                                            QueryLogStore         │
//! │                                                  ▲               │
//! │  feedback ──────────► FeedbackProcessor ─────────┘               │
//! │                                                                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use faq_retrieval::{KnowledgeBase, NewDocument, QueryContext};
//!
//! let kb = KnowledgeBase::builder().with_dimension(384).build()?;
//! kb.documents()
//!     .create(NewDocument::new("reset password", "use the link", "account"))
//!     .await?;
//!
//! let result = kb.answer_query("reset password", QueryContext::default()).await?;
//! kb.submit_feedback(result.log_id, 1, None).await?;
//! ```

pub mod api;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod query_log;
pub mod store;

pub use api::{FeedbackRequest, FeedbackResponse, QueryRequest, QueryResponse};
pub use config::{EmbeddingConfig, EmbeddingProviderType, QueryConfig, RetrievalConfig};
pub use document::{Document, DocumentStatus, DocumentUpdate, NewDocument, WriteOutcome};
pub use engine::{
    EngineStats, KnowledgeBase, KnowledgeBaseBuilder, MatchedDocument, QueryContext, QueryResult,
};
pub use error::{Result, RetrievalError};
pub use feedback::{FeedbackOutcome, FeedbackProcessor};
pub use query_log::{Feedback, LogId, NewQueryLog, QueryLog, QueryLogStore};
pub use store::{DocumentStore, ReindexReport};

// Re-export from dependencies for convenience
pub use faq_embeddings::{Consistency, HashEmbedder, IndexConfig, TextEmbedder, VectorIndex};
