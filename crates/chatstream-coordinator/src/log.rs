use chatstream_core::types::{Message, Role};

use crate::event::{ChatEvent, ChatEventKind};

/// Consumer-side view of a conversation built from `ChatEvent`s.
///
/// Partial assistant messages of a turn replace each other in place, and
/// events from a turn older than the newest one seen are dropped.
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    latest_turn: u64,
    // Turn that owns the trailing assistant message, if any.
    assistant_turn: Option<u64>,
    last_error: Option<String>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event in. Returns false if it was stale and ignored.
    pub fn apply(&mut self, event: &ChatEvent) -> bool {
        if event.turn < self.latest_turn {
            return false;
        }
        if event.turn > self.latest_turn {
            self.latest_turn = event.turn;
            self.last_error = None;
        }
        match &event.kind {
            ChatEventKind::Message(message) => self.push(event.turn, message),
            ChatEventKind::Completed => {}
            ChatEventKind::Failed { error } => self.last_error = Some(error.clone()),
        }
        true
    }

    fn push(&mut self, turn: u64, message: &Message) {
        if message.role == Role::Assistant && self.assistant_turn == Some(turn) {
            if let Some(last) = self.messages.last_mut() {
                *last = message.clone();
                return;
            }
        }
        self.assistant_turn = (message.role == Role::Assistant).then_some(turn);
        self.messages.push(message.clone());
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    /// Error of the latest turn, if it failed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
