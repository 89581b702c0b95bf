//! Document storage.
//!
//! The `DocumentStore` owns every FAQ document and keeps each document's
//! vector in the index in step with its content.
//!
//! Every record sits behind its own mutex, so counter updates are atomic
//! read-modify-writes per document. Lock order is record first, then the
//! map; map readers clone the record handles and release the map before
//! locking any record.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use faq_embeddings::{DocumentId, TextEmbedder, VectorId, VectorIndex};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::document::{Document, DocumentStatus, DocumentUpdate, NewDocument, WriteOutcome};
use crate::error::{Result, RetrievalError};

/// `None` once the document has been deleted.
type Slot = Arc<Mutex<Option<Document>>>;

/// Authoritative store for FAQ documents.
pub struct DocumentStore {
    documents: RwLock<BTreeMap<DocumentId, Slot>>,
    next_id: AtomicU64,
    embedder: Arc<dyn TextEmbedder>,
    index: Arc<VectorIndex>,
}

/// Counts from a full re-index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexReport {
    pub indexed: usize,
    pub degraded: usize,
}

impl DocumentStore {
    /// Create an empty store that indexes through `embedder` into `index`.
    pub fn new(embedder: Arc<dyn TextEmbedder>, index: Arc<VectorIndex>) -> Result<Self> {
        if embedder.dimension() != index.dimension() {
            return Err(RetrievalError::DimensionMismatch {
                expected: index.dimension(),
                actual: embedder.dimension(),
            });
        }

        Ok(Self {
            documents: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            embedder,
            index,
        })
    }

    async fn slot(&self, id: DocumentId) -> Option<Slot> {
        self.documents.read().await.get(&id).cloned()
    }

    async fn slots(&self) -> Vec<Slot> {
        self.documents.read().await.values().cloned().collect()
    }

    /// Copy out every live document matching `predicate`, ordered by id.
    async fn collect_where<F>(&self, predicate: F) -> Vec<Document>
    where
        F: Fn(&Document) -> bool,
    {
        let mut documents = Vec::new();
        for slot in self.slots().await {
            if let Some(document) = slot.lock().await.as_ref()
                && predicate(document)
            {
                documents.push(document.clone());
            }
        }
        documents
    }

    /// Replace the document's vector with one computed from its content.
    ///
    /// The reference is cleared before the index is touched, so on any
    /// failure the document is left without a `vector_ref` rather than
    /// pointing at a removed or stale vector.
    async fn sync_embedding(&self, document: &mut Document) -> Result<VectorId> {
        document.vector_ref = None;
        self.index.delete_by_document(document.id).await?;

        let vector = self.embedder.embed(&document.embedding_text()).await?;
        let vector_id = self.index.upsert(document.id, vector).await?;
        document.vector_ref = Some(vector_id);
        Ok(vector_id)
    }

    /// Turn the embedding result into a write outcome.
    ///
    /// Backend outages become a degraded success; anything else is a hard
    /// error.
    fn settle(document: &Document, synced: Result<VectorId>) -> Result<WriteOutcome> {
        match synced {
            Ok(vector_id) => {
                debug!("Indexed document {} as vector {vector_id}", document.id);
                Ok(WriteOutcome::Indexed(document.clone()))
            }
            Err(RetrievalError::BackendUnavailable(reason)) => {
                warn!(
                    "Stored document {} without embedding: {reason}",
                    document.id
                );
                Ok(WriteOutcome::Degraded {
                    document: document.clone(),
                    warning: reason,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Create a document and index its embedding.
    pub async fn create(&self, new: NewDocument) -> Result<WriteOutcome> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot: Slot = Arc::new(Mutex::new(Some(Document::from_new(id, new))));

        // Hold the record while indexing so readers see it fully synced.
        let mut guard = Arc::clone(&slot).lock_owned().await;
        self.documents.write().await.insert(id, slot);
        info!("Created document {id}");

        let document = guard
            .as_mut()
            .ok_or_else(|| RetrievalError::document_not_found(id))?;
        let synced = self.sync_embedding(document).await;
        match Self::settle(document, synced) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                // A hard failure means the create never happened.
                self.documents.write().await.remove(&id);
                *guard = None;
                warn!("Rolled back document {id}: {err}");
                Err(err)
            }
        }
    }

    /// Fetch a document, counting the view.
    ///
    /// Increments `access_count` and stamps `last_accessed` atomically.
    pub async fn get_by_id(&self, id: DocumentId) -> Result<Document> {
        let slot = self
            .slot(id)
            .await
            .ok_or_else(|| RetrievalError::document_not_found(id))?;
        let mut guard = slot.lock().await;
        let document = guard
            .as_mut()
            .ok_or_else(|| RetrievalError::document_not_found(id))?;

        document.access_count += 1;
        document.last_accessed = Some(Utc::now());
        Ok(document.clone())
    }

    /// Read a document without counting the view.
    pub async fn peek(&self, id: DocumentId) -> Option<Document> {
        let slot = self.slot(id).await?;
        let guard = slot.lock().await;
        guard.clone()
    }

    /// Replace a document's content and re-index it.
    ///
    /// Bumps `version` by one; counters are untouched.
    pub async fn update(&self, id: DocumentId, update: DocumentUpdate) -> Result<WriteOutcome> {
        let slot = self
            .slot(id)
            .await
            .ok_or_else(|| RetrievalError::document_not_found(id))?;
        let mut guard = slot.lock().await;
        let document = guard
            .as_mut()
            .ok_or_else(|| RetrievalError::document_not_found(id))?;

        document.apply(update);
        info!("Updated document {id} to version {}", document.version);

        let synced = self.sync_embedding(document).await;
        Self::settle(document, synced)
    }

    /// Delete a document and its vectors.
    ///
    /// Returns `false` if the document does not exist. Vectors are removed
    /// before the document, so an index failure leaves both in place.
    pub async fn delete(&self, id: DocumentId) -> Result<bool> {
        let Some(slot) = self.slot(id).await else {
            return Ok(false);
        };
        let mut guard = slot.lock().await;
        if guard.is_none() {
            return Ok(false);
        }

        self.index.delete_by_document(id).await?;
        self.documents.write().await.remove(&id);
        *guard = None;

        info!("Deleted document {id}");
        Ok(true)
    }

    /// Add one positive or negative vote to a document.
    ///
    /// Returns `false` if the document no longer exists.
    pub async fn update_feedback(&self, id: DocumentId, positive: bool) -> Result<bool> {
        let Some(slot) = self.slot(id).await else {
            return Ok(false);
        };
        let mut guard = slot.lock().await;
        let Some(document) = guard.as_mut() else {
            return Ok(false);
        };

        if positive {
            document.feedback_positive += 1;
        } else {
            document.feedback_negative += 1;
        }
        debug!(
            "Document {id} feedback now +{}/-{}",
            document.feedback_positive, document.feedback_negative
        );
        Ok(true)
    }

    /// All documents, ordered by id.
    pub async fn list_all(&self) -> Vec<Document> {
        self.collect_where(|_| true).await
    }

    /// Documents in `category`.
    pub async fn list_by_category(&self, category: &str) -> Vec<Document> {
        self.collect_where(|d| d.category == category).await
    }

    /// Documents with the given status.
    pub async fn list_by_status(&self, status: DocumentStatus) -> Vec<Document> {
        self.collect_where(|d| d.status == status).await
    }

    /// Case-insensitive substring search over question, answer and keywords.
    pub async fn search(&self, keyword: &str) -> Vec<Document> {
        let needle = keyword.to_lowercase();
        self.collect_where(|d| d.matches_keyword(&needle)).await
    }

    /// Distinct categories, sorted.
    pub async fn list_categories(&self) -> Vec<String> {
        let categories: BTreeSet<String> = self
            .list_all()
            .await
            .into_iter()
            .map(|d| d.category)
            .collect();
        categories.into_iter().collect()
    }

    /// The document whose live vector is `vector_id`.
    pub async fn find_by_vector_ref(&self, vector_id: VectorId) -> Option<Document> {
        self.collect_where(|d| d.vector_ref == Some(vector_id))
            .await
            .into_iter()
            .next()
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Check if the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Recompute and re-index every document's embedding.
    ///
    /// Documents the index cannot accept are counted as degraded and left
    /// without a `vector_ref`.
    pub async fn reindex_all(&self) -> Result<ReindexReport> {
        let mut report = ReindexReport::default();

        for slot in self.slots().await {
            let mut guard = slot.lock().await;
            let Some(document) = guard.as_mut() else {
                continue;
            };
            let synced = self.sync_embedding(document).await;
            if Self::settle(document, synced)?.is_degraded() {
                report.degraded += 1;
            } else {
                report.indexed += 1;
            }
        }

        info!(
            "Re-indexed {} documents ({} degraded)",
            report.indexed, report.degraded
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use faq_embeddings::{Consistency, Embedding, EmbeddingError, HashEmbedder, IndexConfig};
    use pretty_assertions::assert_eq;

    const DIMENSION: usize = 8;

    fn store() -> (DocumentStore, Arc<VectorIndex>) {
        let embedder = Arc::new(HashEmbedder::new(DIMENSION).unwrap());
        let index = Arc::new(VectorIndex::open(IndexConfig::new(DIMENSION)).unwrap());
        let store = DocumentStore::new(embedder, Arc::clone(&index)).unwrap();
        (store, index)
    }

    fn faq(question: &str, category: &str) -> NewDocument {
        NewDocument::new(question, format!("answer to {question}"), category)
    }

    #[tokio::test]
    async fn test_create_assigns_defaults_and_indexes() {
        let (store, index) = store();
        let outcome = store.create(faq("reset password", "account")).await.unwrap();

        assert!(!outcome.is_degraded());
        let doc = outcome.document();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.access_count, 0);
        assert_eq!(doc.status, DocumentStatus::Active);
        assert!(doc.vector_ref.is_some());
        assert!(index.contains_document(doc.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_dimension_disagreement_rejected() {
        let embedder = Arc::new(HashEmbedder::new(4).unwrap());
        let index = Arc::new(VectorIndex::open(IndexConfig::new(8)).unwrap());
        assert!(matches!(
            DocumentStore::new(embedder, index),
            Err(RetrievalError::DimensionMismatch {
                expected: 8,
                actual: 4
            })
        ));
    }

    #[tokio::test]
    async fn test_get_by_id_counts_views() {
        let (store, _) = store();
        let id = store.create(faq("q", "c")).await.unwrap().document().id;

        store.get_by_id(id).await.unwrap();
        let doc = store.get_by_id(id).await.unwrap();
        assert_eq!(doc.access_count, 2);
        assert!(doc.last_accessed.is_some());

        assert!(matches!(
            store.get_by_id(999).await,
            Err(RetrievalError::NotFound { id: 999, .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reads_lose_no_increments() {
        let (store, _) = store();
        let store = Arc::new(store);
        let id = store.create(faq("q", "c")).await.unwrap().document().id;
        store.get_by_id(id).await.unwrap();

        let tasks: Vec<_> = (0..64)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.get_by_id(id).await.map(|_| ()) })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.peek(id).await.unwrap().access_count, 65);
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_replaces_vector() {
        let (store, index) = store();
        let created = store.create(faq("q", "c")).await.unwrap().into_document();
        store.get_by_id(created.id).await.unwrap();

        let mut update = DocumentUpdate::from_document(&created);
        update.answer = "new answer".to_string();
        let updated = store.update(created.id, update).await.unwrap().into_document();

        assert_eq!(updated.version, 2);
        assert_eq!(updated.access_count, 1);
        assert_ne!(updated.vector_ref, created.vector_ref);
        assert_eq!(index.len().await.unwrap(), 1);

        let again = store.peek(created.id).await.unwrap();
        assert_eq!(again.version, 2);
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let (store, _) = store();
        let update = DocumentUpdate {
            question: "q".to_string(),
            answer: "a".to_string(),
            category: "c".to_string(),
            keywords: None,
            status: DocumentStatus::Active,
        };
        assert!(matches!(
            store.update(7, update).await,
            Err(RetrievalError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_index() {
        let (store, index) = store();
        let doc = store.create(faq("q", "c")).await.unwrap().into_document();

        assert!(store.delete(doc.id).await.unwrap());
        assert!(!store.delete(doc.id).await.unwrap());
        assert!(store.peek(doc.id).await.is_none());

        let embedder = HashEmbedder::new(DIMENSION).unwrap();
        let query = embedder.embed_sync(&doc.embedding_text());
        let ids = index
            .search(&query, 10, Consistency::Strong)
            .await
            .unwrap();
        assert!(!ids.contains(&doc.id));
    }

    #[tokio::test]
    async fn test_delete_keeps_document_when_index_unavailable() {
        let (store, index) = store();
        let id = store.create(faq("q", "c")).await.unwrap().document().id;
        index.close().await;

        assert!(matches!(
            store.delete(id).await,
            Err(RetrievalError::BackendUnavailable(_))
        ));
        assert!(store.peek(id).await.is_some());
    }

    #[tokio::test]
    async fn test_create_degrades_when_index_unavailable() {
        let (store, index) = store();
        index.close().await;

        let outcome = store.create(faq("q", "c")).await.unwrap();
        assert!(outcome.is_degraded());
        assert!(outcome.warning().is_some());
        assert_eq!(outcome.document().vector_ref, None);

        let stored = store.peek(outcome.document().id).await.unwrap();
        assert_eq!(stored.vector_ref, None);
        assert_eq!(store.search("q").await.len(), 1);
    }

    #[tokio::test]
    async fn test_update_feedback() {
        let (store, _) = store();
        let id = store.create(faq("q", "c")).await.unwrap().document().id;

        assert!(store.update_feedback(id, true).await.unwrap());
        assert!(store.update_feedback(id, false).await.unwrap());
        assert!(store.update_feedback(id, true).await.unwrap());
        assert!(!store.update_feedback(404, true).await.unwrap());

        let doc = store.peek(id).await.unwrap();
        assert_eq!(doc.feedback_positive, 2);
        assert_eq!(doc.feedback_negative, 1);
        assert_eq!(doc.version, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_feedback_loses_no_votes() {
        let (store, _) = store();
        let store = Arc::new(store);
        let id = store.create(faq("q", "c")).await.unwrap().document().id;

        let tasks: Vec<_> = (0..48)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.update_feedback(id, i % 3 != 0).await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().unwrap());
        }

        let doc = store.peek(id).await.unwrap();
        assert_eq!(doc.feedback_positive, 32);
        assert_eq!(doc.feedback_negative, 16);
    }

    #[tokio::test]
    async fn test_update_degrades_without_stale_vector_ref() {
        let (store, index) = store();
        let created = store.create(faq("q", "c")).await.unwrap().into_document();
        let old_ref = created.vector_ref.unwrap();
        index.close().await;

        let mut update = DocumentUpdate::from_document(&created);
        update.answer = "changed".to_string();
        let outcome = store.update(created.id, update).await.unwrap();

        assert!(outcome.is_degraded());
        assert_eq!(outcome.document().vector_ref, None);
        assert_eq!(outcome.document().answer, "changed");

        let stored = store.peek(created.id).await.unwrap();
        assert_eq!(stored.vector_ref, None);
        assert_eq!(stored.version, 2);
        assert!(store.find_by_vector_ref(old_ref).await.is_none());
    }

    struct ShortVectorEmbedder;

    #[async_trait]
    impl TextEmbedder for ShortVectorEmbedder {
        fn name(&self) -> &str {
            "short"
        }

        fn dimension(&self) -> usize {
            DIMENSION
        }

        async fn embed(&self, _text: &str) -> std::result::Result<Embedding, EmbeddingError> {
            Ok(vec![0.0; DIMENSION / 2])
        }
    }

    #[tokio::test]
    async fn test_create_rolls_back_on_hard_embedding_failure() {
        let index = Arc::new(VectorIndex::open(IndexConfig::new(DIMENSION)).unwrap());
        let store = DocumentStore::new(Arc::new(ShortVectorEmbedder), index).unwrap();

        assert!(matches!(
            store.create(faq("q", "c")).await,
            Err(RetrievalError::DimensionMismatch { .. })
        ));
        assert!(store.is_empty().await);
        assert!(store.list_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_read_queries() {
        let (store, _) = store();
        store
            .create(faq("Reset Password", "account").with_keywords("login"))
            .await
            .unwrap();
        store.create(faq("Refund policy", "billing")).await.unwrap();
        store
            .create(faq("Change email", "account").with_status(DocumentStatus::Inactive))
            .await
            .unwrap();

        assert_eq!(store.list_by_category("account").await.len(), 2);
        assert_eq!(store.search("PASSWORD").await.len(), 1);
        assert_eq!(store.search("LOGIN").await.len(), 1);
        assert_eq!(store.list_by_status(DocumentStatus::Inactive).await.len(), 1);
        assert_eq!(
            store.list_categories().await,
            vec!["account".to_string(), "billing".to_string()]
        );

        let all = store.list_all().await;
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|d| d.access_count == 0));
    }

    #[tokio::test]
    async fn test_find_by_vector_ref() {
        let (store, _) = store();
        let doc = store.create(faq("q", "c")).await.unwrap().into_document();
        let vector_id = doc.vector_ref.unwrap();

        let found = store.find_by_vector_ref(vector_id).await.unwrap();
        assert_eq!(found.id, doc.id);
    }

    #[tokio::test]
    async fn test_reindex_all_restores_vectors() {
        let embedder = Arc::new(HashEmbedder::new(DIMENSION).unwrap());
        let index = Arc::new(VectorIndex::open(IndexConfig::new(DIMENSION)).unwrap());
        let store = DocumentStore::new(embedder, Arc::clone(&index)).unwrap();

        store.create(faq("a", "c")).await.unwrap();
        store.create(faq("b", "c")).await.unwrap();

        let report = store.reindex_all().await.unwrap();
        assert_eq!(report, ReindexReport { indexed: 2, degraded: 0 });
        assert_eq!(index.len().await.unwrap(), 2);
    }
}
