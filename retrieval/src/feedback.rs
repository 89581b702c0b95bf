//! Feedback processing.
//!
//! Feedback is accepted once per query log entry. A second submission is
//! rejected and leaves both the entry and the document counters untouched,
//! so the counters always equal the sum of recorded log feedback.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::query_log::{Feedback, FeedbackRecord, LogId, QueryLogStore};
use crate::store::DocumentStore;

/// Result of a feedback submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackOutcome {
    /// Feedback stored on the log and counted on its document.
    Recorded,

    /// Feedback stored on the log; the matched document no longer exists.
    RecordedWithoutDocument,

    /// No log entry with that id.
    UnknownLog,

    /// The log entry already has feedback.
    AlreadySubmitted,
}

impl FeedbackOutcome {
    /// Whether the submission was accepted.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Recorded | Self::RecordedWithoutDocument)
    }

    /// Human-readable description.
    pub fn message(self) -> &'static str {
        match self {
            Self::Recorded | Self::RecordedWithoutDocument => "feedback submitted",
            Self::UnknownLog => "feedback rejected: query log not found",
            Self::AlreadySubmitted => "feedback rejected: already submitted for this query",
        }
    }
}

/// Applies user feedback to query logs and document counters.
pub struct FeedbackProcessor {
    logs: Arc<QueryLogStore>,
    documents: Arc<DocumentStore>,
}

impl FeedbackProcessor {
    pub fn new(logs: Arc<QueryLogStore>, documents: Arc<DocumentStore>) -> Self {
        Self { logs, documents }
    }

    /// Submit `polarity` (`1` or `-1`) for a log entry.
    ///
    /// An invalid polarity is a validation error raised before anything is
    /// written. Unknown and already-answered logs are reported through the
    /// outcome rather than as errors.
    pub async fn submit_feedback(
        &self,
        log_id: LogId,
        polarity: i32,
        feedback_text: Option<String>,
    ) -> Result<FeedbackOutcome> {
        let feedback = Feedback::try_from(polarity)?;

        let log = match self
            .logs
            .record_feedback(log_id, feedback, feedback_text)
            .await
        {
            FeedbackRecord::Recorded(log) => log,
            FeedbackRecord::UnknownLog => {
                debug!("Feedback for unknown log {log_id}");
                return Ok(FeedbackOutcome::UnknownLog);
            }
            FeedbackRecord::AlreadySubmitted(_) => {
                debug!("Feedback for log {log_id} already submitted");
                return Ok(FeedbackOutcome::AlreadySubmitted);
            }
        };

        let Some(document_id) = log.document_id else {
            info!("Recorded {feedback:?} feedback on unmatched query {log_id}");
            return Ok(FeedbackOutcome::Recorded);
        };

        let counted = self
            .documents
            .update_feedback(document_id, feedback.is_positive())
            .await?;
        info!("Recorded {feedback:?} feedback on query {log_id} for document {document_id}");

        Ok(if counted {
            FeedbackOutcome::Recorded
        } else {
            FeedbackOutcome::RecordedWithoutDocument
        })
    }
}
