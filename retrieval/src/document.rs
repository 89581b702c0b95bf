//! FAQ document types.
//!
//! A document is one question/answer pair plus the statistics the engine
//! keeps about it: view count, feedback counters, and an edit version.

use chrono::{DateTime, Utc};
use faq_embeddings::{DocumentId, VectorId};
use serde::{Deserialize, Serialize};

/// Whether a document is live in the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    Active,
    Inactive,
}

/// A stored FAQ document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identity.
    pub id: DocumentId,

    pub question: String,

    pub answer: String,

    pub category: String,

    pub keywords: Option<String>,

    pub status: DocumentStatus,

    /// The live vector for this document, if embedding succeeded.
    pub vector_ref: Option<VectorId>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub last_accessed: Option<DateTime<Utc>>,

    /// Number of times the document was fetched by id.
    pub access_count: u64,

    pub feedback_positive: u64,

    pub feedback_negative: u64,

    /// Starts at 1 and grows by one per successful update.
    pub version: u64,
}

impl Document {
    pub(crate) fn from_new(id: DocumentId, new: NewDocument) -> Self {
        let now = Utc::now();
        Self {
            id,
            question: new.question,
            answer: new.answer,
            category: new.category,
            keywords: new.keywords,
            status: new.status.unwrap_or_default(),
            vector_ref: None,
            created_at: now,
            updated_at: now,
            last_accessed: None,
            access_count: new.access_count.unwrap_or(0),
            feedback_positive: new.feedback_positive.unwrap_or(0),
            feedback_negative: new.feedback_negative.unwrap_or(0),
            version: new.version.unwrap_or(1),
        }
    }

    /// Text the embedding is computed over.
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.question, self.answer)
    }

    /// Case-insensitive substring match over question, answer and keywords.
    ///
    /// `needle` must already be lowercase.
    pub(crate) fn matches_keyword(&self, needle: &str) -> bool {
        self.question.to_lowercase().contains(needle)
            || self.answer.to_lowercase().contains(needle)
            || self
                .keywords
                .as_deref()
                .is_some_and(|k| k.to_lowercase().contains(needle))
    }

    pub(crate) fn apply(&mut self, update: DocumentUpdate) {
        self.question = update.question;
        self.answer = update.answer;
        self.category = update.category;
        self.keywords = update.keywords;
        self.status = update.status;
        self.updated_at = Utc::now();
        self.version += 1;
    }
}

/// Input for creating a document.
///
/// Optional fields left unset take their defaults: active status, zero
/// counters, version 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub question: String,
    pub answer: String,
    pub category: String,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub status: Option<DocumentStatus>,
    #[serde(default)]
    pub access_count: Option<u64>,
    #[serde(default)]
    pub feedback_positive: Option<u64>,
    #[serde(default)]
    pub feedback_negative: Option<u64>,
    #[serde(default)]
    pub version: Option<u64>,
}

impl NewDocument {
    /// Create input for a new document.
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            category: category.into(),
            ..Self::default()
        }
    }

    /// Set the keywords.
    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: DocumentStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Replacement content for an existing document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUpdate {
    pub question: String,
    pub answer: String,
    pub category: String,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub status: DocumentStatus,
}

impl DocumentUpdate {
    /// Start an update from a document's current content.
    pub fn from_document(document: &Document) -> Self {
        Self {
            question: document.question.clone(),
            answer: document.answer.clone(),
            category: document.category.clone(),
            keywords: document.keywords.clone(),
            status: document.status,
        }
    }
}

/// Result of a document write whose embedding step may have failed.
///
/// The document write itself always succeeded. When indexing did not, the
/// document is kept without a `vector_ref` and remains reachable through
/// keyword search.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// Document stored and indexed.
    Indexed(Document),

    /// Document stored, embedding not indexed.
    Degraded { document: Document, warning: String },
}

impl WriteOutcome {
    /// The stored document.
    pub fn document(&self) -> &Document {
        match self {
            Self::Indexed(document) | Self::Degraded { document, .. } => document,
        }
    }

    /// Consume the outcome, keeping the document.
    pub fn into_document(self) -> Document {
        match self {
            Self::Indexed(document) | Self::Degraded { document, .. } => document,
        }
    }

    /// Whether the embedding step failed.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// The embedding failure, if any.
    pub fn warning(&self) -> Option<&str> {
        match self {
            Self::Indexed(_) => None,
            Self::Degraded { warning, .. } => Some(warning),
        }
    }
}
