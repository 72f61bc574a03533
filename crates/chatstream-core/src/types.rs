//! Domain types shared by the assembly pipeline and its collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A retrieved document the answer may cite.
///
/// Both fields are optional: upstream entries with missing or malformed
/// metadata still occupy a slot so that citation numbers keep lining up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: Option<String>,
    pub title: Option<String>,
}

impl Source {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self { url: Some(url.into()), title: Some(title.into()) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Function,
}

/// One renderable piece of an answer.
///
/// Concatenating the segments in order reconstructs the full answer, with
/// each resolved citation marker replaced by a `Citation` segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerSegment {
    Text { html: String },
    Citation { source_index: usize, source: Source, highlighted: bool },
}

impl AnswerSegment {
    pub fn is_citation(&self) -> bool {
        matches!(self, AnswerSegment::Citation { .. })
    }
}

/// A chat message as seen by subscribers.
///
/// Messages are values: a streaming update produces a new `Message` rather
/// than mutating a previous one.
///
/// - `content`: rendered HTML of the whole answer (or the raw user text)
/// - `run_id`: upstream run identifier, once assigned
/// - `sources`: raw (non-deduplicated) sources in upstream order
/// - `segments`: answer split into prose and resolved citations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<AnswerSegment>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            run_id: None,
            sources: None,
            segments: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(
        content: impl Into<String>,
        run_id: Option<String>,
        sources: Option<Vec<Source>>,
        segments: Vec<AnswerSegment>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: content.into(),
            run_id,
            sources,
            segments,
            created_at: Utc::now(),
        }
    }
}

/// A completed exchange, replayed to the service as conversation context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub human: String,
    pub ai: String,
}

/// Input half of a stream request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatInput {
    pub question: String,
    pub chat_history: Vec<ChatTurn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configurable {
    pub llm: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub conversation_id: String,
    pub llm: String,
}

/// Run options forwarded to the remote service.
///
/// `include_names` restricts the streamed log to the named steps so that the
/// retrieval step's output shows up under `logs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamOptions {
    pub configurable: Configurable,
    pub tags: Vec<String>,
    pub metadata: RunMetadata,
    pub include_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRequest {
    pub input: ChatInput,
    pub options: StreamOptions,
}

impl StreamRequest {
    pub fn new(
        question: impl Into<String>,
        chat_history: Vec<ChatTurn>,
        llm: &str,
        conversation_id: &str,
        source_step: &str,
    ) -> Self {
        Self {
            input: ChatInput { question: question.into(), chat_history },
            options: StreamOptions {
                configurable: Configurable { llm: llm.to_string() },
                tags: vec![format!("model:{llm}")],
                metadata: RunMetadata {
                    conversation_id: conversation_id.to_string(),
                    llm: llm.to_string(),
                },
                include_names: vec![source_step.to_string()],
            },
        }
    }
}
