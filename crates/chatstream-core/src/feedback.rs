//! Feedback request/receipt wire types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackMethod {
    /// New feedback record.
    Post,
    /// Update of a record whose id the caller already holds.
    Patch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub key: String,
    pub run_id: String,
    pub score: Option<f64>,
    pub value: Option<String>,
    pub comment: Option<String>,
    pub feedback_id: Option<String>,
    pub is_explicit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub is_explicit: bool,
}

/// JSON body sent to the feedback endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackBody {
    pub score: Option<f64>,
    pub run_id: String,
    pub key: String,
    pub value: Option<String>,
    pub feedback_id: String,
    pub comment: Option<String>,
    pub source_info: SourceInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackReceipt {
    pub feedback_id: String,
    pub code: u16,
    pub result: String,
}

impl FeedbackRequest {
    pub fn new(key: impl Into<String>, run_id: impl Into<String>, is_explicit: bool) -> Self {
        Self {
            key: key.into(),
            run_id: run_id.into(),
            score: None,
            value: None,
            comment: None,
            feedback_id: None,
            is_explicit,
        }
    }

    #[must_use]
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Free-form value, for keys that are not scored.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    #[must_use]
    pub fn with_feedback_id(mut self, id: impl Into<String>) -> Self {
        self.feedback_id = Some(id.into());
        self
    }

    /// Method and body for this request. A fresh feedback id is minted when
    /// the caller did not supply one.
    pub fn into_body(self) -> (FeedbackMethod, FeedbackBody) {
        let (method, feedback_id) = match self.feedback_id {
            Some(id) => (FeedbackMethod::Patch, id),
            None => (FeedbackMethod::Post, Uuid::new_v4().to_string()),
        };
        let body = FeedbackBody {
            score: self.score,
            run_id: self.run_id,
            key: self.key,
            value: self.value,
            feedback_id,
            comment: self.comment,
            source_info: SourceInfo { is_explicit: self.is_explicit },
        };
        (method, body)
    }
}
