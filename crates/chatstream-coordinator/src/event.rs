use chatstream_core::types::Message;
use serde::{Deserialize, Serialize};

/// What a conversation's subscribers receive. `turn` increases with every
/// accepted send, so a consumer can tell a superseded turn from the current one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEvent {
    pub turn: u64,
    pub kind: ChatEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEventKind {
    Message(Message),
    /// The stream closed normally; the last assistant message is final.
    Completed,
    /// The turn was aborted; the last assistant message, if any, is partial.
    Failed { error: String },
}

/// Only `Idle` accepts a new send; `Completed` lasts until the finishing
/// call has published history and its final event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Streaming,
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Blank input, or a turn was already streaming.
    Ignored,
    Completed {
        /// Last assistant message emitted, `None` if the stream produced no text.
        message: Option<Message>,
        skipped_ops: usize,
    },
}
