//! Request and response bodies for the query endpoints.
//!
//! These mirror the JSON exchanged with the HTTP layer: `POST /query` and
//! `POST /query/feedback`. The document endpoints serialize
//! [`Document`](crate::Document) directly.

use faq_embeddings::DocumentId;
use serde::{Deserialize, Serialize};

use crate::engine::{KnowledgeBase, QueryContext, QueryResult};
use crate::error::Result;
use crate::query_log::LogId;

const NO_MATCH_MESSAGE: &str = "no matching FAQ found";

/// Body of `POST /query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub user_id: Option<u64>,
}

/// Response of `POST /query`.
///
/// `success = false` with a `log_id` is a logged miss, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub log_id: LogId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<QueryResult> for QueryResponse {
    fn from(result: QueryResult) -> Self {
        match result.document {
            Some(document) => Self {
                success: true,
                id: Some(document.id),
                question: Some(document.question),
                answer: Some(document.answer),
                category: Some(document.category),
                log_id: result.log_id,
                message: None,
            },
            None => Self {
                success: false,
                id: None,
                question: None,
                answer: None,
                category: None,
                log_id: result.log_id,
                message: Some(NO_MATCH_MESSAGE.to_string()),
            },
        }
    }
}

/// Body of `POST /query/feedback`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub log_id: LogId,
    /// `1` for helpful, `-1` for not helpful.
    pub feedback: i32,
    #[serde(default)]
    pub feedback_text: Option<String>,
}

/// Response of `POST /query/feedback`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub success: bool,
    pub message: String,
}

impl KnowledgeBase {
    /// Serve `POST /query`.
    pub async fn handle_query(&self, request: QueryRequest) -> Result<QueryResponse> {
        let context = QueryContext {
            user_id: request.user_id,
            session_id: request.session_id,
            ip_address: request.ip_address,
            user_agent: request.user_agent,
        };
        let result = self.answer_query(&request.query, context).await?;
        Ok(result.into())
    }

    /// Serve `POST /query/feedback`.
    pub async fn handle_feedback(&self, request: FeedbackRequest) -> Result<FeedbackResponse> {
        let outcome = self
            .submit_feedback(request.log_id, request.feedback, request.feedback_text)
            .await?;
        Ok(FeedbackResponse {
            success: outcome.is_success(),
            message: outcome.message().to_string(),
        })
    }
}
