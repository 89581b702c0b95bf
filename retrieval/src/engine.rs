//! Retrieval engine implementation.

use std::sync::Arc;

use faq_embeddings::{Consistency, DocumentId, HashEmbedder, IndexStats, TextEmbedder, VectorIndex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{EmbeddingProviderType, RetrievalConfig};
use crate::error::{Result, RetrievalError};
use crate::feedback::{FeedbackOutcome, FeedbackProcessor};
use crate::query_log::{LogId, NewQueryLog, QueryLogStore};
use crate::store::DocumentStore;

/// Who asked a query and from where. Copied verbatim into the query log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContext {
    pub user_id: Option<u64>,
    pub session_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// The document returned for a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedDocument {
    pub id: DocumentId,
    pub question: String,
    pub answer: String,
    pub category: String,
}

/// Outcome of one query. A miss is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    /// The best match, if the index returned any live document.
    pub document: Option<MatchedDocument>,

    /// Log entry written for this query; feedback refers to it.
    pub log_id: LogId,
}

impl QueryResult {
    pub fn is_match(&self) -> bool {
        self.document.is_some()
    }
}

/// FAQ retrieval engine.
///
/// This is the main entry point. It coordinates:
/// - Text embedding of queries
/// - Nearest-neighbor search over document vectors
/// - Document fetch with view counting
/// - Query logging and feedback
pub struct KnowledgeBase {
    config: RetrievalConfig,
    embedder: Arc<dyn TextEmbedder>,
    index: Arc<VectorIndex>,
    documents: Arc<DocumentStore>,
    logs: Arc<QueryLogStore>,
    feedback: FeedbackProcessor,
}

impl KnowledgeBase {
    /// Create a new engine builder.
    pub fn builder() -> KnowledgeBaseBuilder {
        KnowledgeBaseBuilder::new()
    }

    /// Initialize the engine with the configured embedding provider.
    pub fn new(config: RetrievalConfig) -> Result<Self> {
        config.validate()?;
        let embedder: Arc<dyn TextEmbedder> = match config.embedding.provider {
            EmbeddingProviderType::Hash => Arc::new(HashEmbedder::new(config.embedding.dimension)?),
        };
        Self::with_embedder(config, embedder)
    }

    /// Initialize the engine with a caller-supplied embedder.
    pub fn with_embedder(config: RetrievalConfig, embedder: Arc<dyn TextEmbedder>) -> Result<Self> {
        config.validate()?;
        info!(
            "Initializing retrieval engine with {} embedder ({} dimensions)",
            embedder.name(),
            embedder.dimension()
        );

        let index = Arc::new(VectorIndex::open(config.index.clone())?);
        let documents = Arc::new(DocumentStore::new(
            Arc::clone(&embedder),
            Arc::clone(&index),
        )?);
        let logs = Arc::new(QueryLogStore::new());
        let feedback = FeedbackProcessor::new(Arc::clone(&logs), Arc::clone(&documents));

        Ok(Self {
            config,
            embedder,
            index,
            documents,
            logs,
            feedback,
        })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn logs(&self) -> &QueryLogStore {
        &self.logs
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Answer a free-text query and log it.
    ///
    /// Candidates come back nearest first; the first one that still exists
    /// is fetched (counting a view) and becomes the match. Search failures
    /// propagate, since a read has no fallback.
    pub async fn answer_query(
        &self,
        query_text: &str,
        context: QueryContext,
    ) -> Result<QueryResult> {
        if query_text.is_empty() {
            return Err(RetrievalError::Validation(
                "query text must not be empty".to_string(),
            ));
        }

        debug!("Processing query: {query_text}");
        let query_vector = self.embedder.embed(query_text).await?;
        let candidates = self
            .index
            .search(
                &query_vector,
                self.config.query.top_k,
                self.config.query.consistency,
            )
            .await?;

        let mut best = None;
        for id in candidates {
            match self.documents.get_by_id(id).await {
                Ok(document) => {
                    best = Some(document);
                    break;
                }
                Err(RetrievalError::NotFound { .. }) => {
                    debug!("Candidate {id} deleted since search, trying next");
                }
                Err(err) => return Err(err),
            }
        }

        let log = self
            .logs
            .create(NewQueryLog {
                user_id: context.user_id,
                query_text: query_text.to_string(),
                document_id: best.as_ref().map(|d| d.id),
                response: best.as_ref().map(|d| d.answer.clone()),
                session_id: context.session_id,
                ip_address: context.ip_address,
                user_agent: context.user_agent,
            })
            .await;

        match &best {
            Some(document) => info!("Query {} matched document {}", log.id, document.id),
            None => info!("Query {} found no match", log.id),
        }

        Ok(QueryResult {
            document: best.map(|d| MatchedDocument {
                id: d.id,
                question: d.question,
                answer: d.answer,
                category: d.category,
            }),
            log_id: log.id,
        })
    }

    /// Submit feedback for a logged query.
    pub async fn submit_feedback(
        &self,
        log_id: LogId,
        polarity: i32,
        feedback_text: Option<String>,
    ) -> Result<FeedbackOutcome> {
        self.feedback
            .submit_feedback(log_id, polarity, feedback_text)
            .await
    }

    /// Get engine statistics.
    pub async fn stats(&self) -> Result<EngineStats> {
        Ok(EngineStats {
            documents: self.documents.len().await,
            query_logs: self.logs.len().await,
            index: self.index.stats().await?,
        })
    }

    /// Close the vector index. Later searches fail as unavailable.
    pub async fn close(&self) {
        self.index.close().await;
        info!("Retrieval engine closed");
    }
}

/// Builder for the retrieval engine.
pub struct KnowledgeBaseBuilder {
    config: RetrievalConfig,
    embedder: Option<Arc<dyn TextEmbedder>>,
}

impl KnowledgeBaseBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: RetrievalConfig::default(),
            embedder: None,
        }
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the embedding and index dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.config.embedding.dimension = dimension;
        self.config.index.dimension = dimension;
        self
    }

    /// Set how many candidates each query considers.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.config.query.top_k = top_k;
        self
    }

    /// Set the consistency level for query searches.
    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.config.query.consistency = consistency;
        self
    }

    /// Use a custom embedder instead of the configured provider.
    pub fn with_embedder(mut self, embedder: Arc<dyn TextEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Build the engine.
    pub fn build(self) -> Result<KnowledgeBase> {
        match self.embedder {
            Some(embedder) => KnowledgeBase::with_embedder(self.config, embedder),
            None => KnowledgeBase::new(self.config),
        }
    }
}

impl Default for KnowledgeBaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the retrieval engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub documents: usize,
    pub query_logs: usize,
    pub index: IndexStats,
}
