//! Query audit log.
//!
//! One entry is written per answered query, hit or miss. Entries never
//! change afterwards except for a single feedback submission.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use faq_embeddings::DocumentId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::RetrievalError;

/// Identifier of a query log entry.
pub type LogId = u64;

/// Whether a returned answer was judged helpful.
///
/// Serialized as `1` or `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum Feedback {
    Positive,
    Negative,
}

impl Feedback {
    pub fn is_positive(self) -> bool {
        matches!(self, Self::Positive)
    }
}

impl TryFrom<i32> for Feedback {
    type Error = RetrievalError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Positive),
            -1 => Ok(Self::Negative),
            other => Err(RetrievalError::Validation(format!(
                "feedback must be 1 or -1, got {other}"
            ))),
        }
    }
}

impl From<Feedback> for i32 {
    fn from(feedback: Feedback) -> Self {
        match feedback {
            Feedback::Positive => 1,
            Feedback::Negative => -1,
        }
    }
}

/// A recorded query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLog {
    pub id: LogId,
    pub user_id: Option<u64>,
    pub query_text: String,

    /// The matched document, if any.
    pub document_id: Option<DocumentId>,

    /// The matched answer as it read when the query ran.
    pub response: Option<String>,

    pub feedback: Option<Feedback>,
    pub feedback_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub session_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Input for a new log entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewQueryLog {
    pub user_id: Option<u64>,
    pub query_text: String,
    pub document_id: Option<DocumentId>,
    pub response: Option<String>,
    pub session_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Result of trying to attach feedback to a log entry.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackRecord {
    /// Feedback stored; carries the updated entry.
    Recorded(QueryLog),

    /// No entry with that id.
    UnknownLog,

    /// The entry already carries feedback; nothing was changed.
    AlreadySubmitted(QueryLog),
}

/// In-memory store for query log entries.
pub struct QueryLogStore {
    logs: RwLock<BTreeMap<LogId, QueryLog>>,
    next_id: AtomicU64,
}

impl QueryLogStore {
    /// Create an empty log store.
    pub fn new() -> Self {
        Self {
            logs: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Append a new entry.
    pub async fn create(&self, new: NewQueryLog) -> QueryLog {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let log = QueryLog {
            id,
            user_id: new.user_id,
            query_text: new.query_text,
            document_id: new.document_id,
            response: new.response,
            feedback: None,
            feedback_text: None,
            created_at: Utc::now(),
            session_id: new.session_id,
            ip_address: new.ip_address,
            user_agent: new.user_agent,
        };

        self.logs.write().await.insert(id, log.clone());
        debug!("Logged query {id}");
        log
    }

    /// Get an entry by id.
    pub async fn get(&self, id: LogId) -> Option<QueryLog> {
        self.logs.read().await.get(&id).cloned()
    }

    /// Attach feedback to an entry that has none yet.
    ///
    /// The check and the write happen under one lock, so concurrent
    /// submissions against the same entry record exactly one.
    pub async fn record_feedback(
        &self,
        id: LogId,
        feedback: Feedback,
        feedback_text: Option<String>,
    ) -> FeedbackRecord {
        let mut logs = self.logs.write().await;
        let Some(log) = logs.get_mut(&id) else {
            return FeedbackRecord::UnknownLog;
        };
        if log.feedback.is_some() {
            return FeedbackRecord::AlreadySubmitted(log.clone());
        }

        log.feedback = Some(feedback);
        log.feedback_text = feedback_text;
        FeedbackRecord::Recorded(log.clone())
    }

    async fn collect_where<F>(&self, predicate: F) -> Vec<QueryLog>
    where
        F: Fn(&QueryLog) -> bool,
    {
        self.logs
            .read()
            .await
            .values()
            .filter(|log| predicate(log))
            .cloned()
            .collect()
    }

    /// All entries, oldest first.
    pub async fn all(&self) -> Vec<QueryLog> {
        self.collect_where(|_| true).await
    }

    pub async fn by_user(&self, user_id: u64) -> Vec<QueryLog> {
        self.collect_where(|log| log.user_id == Some(user_id)).await
    }

    pub async fn by_document(&self, document_id: DocumentId) -> Vec<QueryLog> {
        self.collect_where(|log| log.document_id == Some(document_id))
            .await
    }

    pub async fn by_session(&self, session_id: &str) -> Vec<QueryLog> {
        self.collect_where(|log| log.session_id.as_deref() == Some(session_id))
            .await
    }

    /// Entries that received feedback.
    pub async fn with_feedback(&self) -> Vec<QueryLog> {
        self.collect_where(|log| log.feedback.is_some()).await
    }

    pub async fn by_feedback(&self, feedback: Feedback) -> Vec<QueryLog> {
        self.collect_where(|log| log.feedback == Some(feedback))
            .await
    }

    /// Entries created within `[start, end]`.
    pub async fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<QueryLog> {
        self.collect_where(|log| log.created_at >= start && log.created_at <= end)
            .await
    }

    /// Number of queries per UTC day, newest day first.
    pub async fn daily_counts(&self) -> Vec<(NaiveDate, usize)> {
        let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for log in self.logs.read().await.values() {
            *counts.entry(log.created_at.date_naive()).or_default() += 1;
        }
        counts.into_iter().rev().collect()
    }

    /// Number of entries.
    pub async fn len(&self) -> usize {
        self.logs.read().await.len()
    }

    /// Check if no query has been logged.
    pub async fn is_empty(&self) -> bool {
        self.logs.read().await.is_empty()
    }
}

impl Default for QueryLogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn query(text: &str, document_id: Option<DocumentId>) -> NewQueryLog {
        NewQueryLog {
            query_text: text.to_string(),
            document_id,
            session_id: Some("s-1".to_string()),
            ..NewQueryLog::default()
        }
    }

    #[test]
    fn test_feedback_polarity() {
        assert_eq!(Feedback::try_from(1).unwrap(), Feedback::Positive);
        assert_eq!(Feedback::try_from(-1).unwrap(), Feedback::Negative);
        assert!(matches!(
            Feedback::try_from(0),
            Err(RetrievalError::Validation(_))
        ));
        assert_eq!(i32::from(Feedback::Negative), -1);
    }

    #[test]
    fn test_feedback_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Feedback::Positive).unwrap(), "1");
        let parsed: Feedback = serde_json::from_str("-1").unwrap();
        assert_eq!(parsed, Feedback::Negative);
        assert!(serde_json::from_str::<Feedback>("2").is_err());
    }

    #[tokio::test]
    async fn test_create_assigns_ids() {
        let store = QueryLogStore::new();
        let first = store.create(query("a", None)).await;
        let second = store.create(query("b", Some(3))).await;

        assert_ne!(first.id, second.id);
        assert_eq!(first.feedback, None);
        assert_eq!(store.get(second.id).await.unwrap().document_id, Some(3));
    }

    #[tokio::test]
    async fn test_record_feedback_once() {
        let store = QueryLogStore::new();
        let log = store.create(query("a", Some(1))).await;

        let first = store
            .record_feedback(log.id, Feedback::Positive, Some("great".to_string()))
            .await;
        assert!(matches!(first, FeedbackRecord::Recorded(_)));

        let second = store.record_feedback(log.id, Feedback::Negative, None).await;
        let FeedbackRecord::AlreadySubmitted(current) = second else {
            panic!("second submission should be rejected");
        };
        assert_eq!(current.feedback, Some(Feedback::Positive));
        assert_eq!(current.feedback_text.as_deref(), Some("great"));
        assert_eq!(current.query_text, "a");

        assert_eq!(
            store.record_feedback(99, Feedback::Positive, None).await,
            FeedbackRecord::UnknownLog
        );
    }

    #[tokio::test]
    async fn test_filters() {
        let store = QueryLogStore::new();
        let a = store.create(query("a", Some(1))).await;
        store.create(query("b", Some(2))).await;
        store
            .create(NewQueryLog {
                user_id: Some(7),
                ..query("c", None)
            })
            .await;
        store.record_feedback(a.id, Feedback::Negative, None).await;

        assert_eq!(store.by_document(1).await.len(), 1);
        assert_eq!(store.by_user(7).await.len(), 1);
        assert_eq!(store.by_session("s-1").await.len(), 3);
        assert_eq!(store.with_feedback().await.len(), 1);
        assert_eq!(store.by_feedback(Feedback::Negative).await.len(), 1);
        assert!(store.by_feedback(Feedback::Positive).await.is_empty());

        let now = Utc::now();
        let window = store
            .between(now - Duration::minutes(5), now + Duration::minutes(5))
            .await;
        assert_eq!(window.len(), 3);
        assert!(
            store
                .between(now + Duration::hours(1), now + Duration::hours(2))
                .await
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_daily_counts() {
        let store = QueryLogStore::new();
        store.create(query("a", None)).await;
        store.create(query("b", None)).await;

        let counts = store.daily_counts().await;
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].1, 2);
    }
}
