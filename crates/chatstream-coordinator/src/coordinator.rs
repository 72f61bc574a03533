use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chatstream_cite::CitationResolver;
use chatstream_core::config::{ChatSettings, Settings};
use chatstream_core::error::{Error, Result};
use chatstream_core::patch::PatchChunk;
use chatstream_core::traits::{ChunkStream, Renderer, Transport};
use chatstream_core::types::{ChatTurn, Message, StreamRequest};
use chatstream_extract::{DocumentExtractor, Extraction};
use futures::StreamExt;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::assemble::TurnAssembler;
use crate::event::{ChatEvent, ChatEventKind, TurnOutcome, TurnState};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drives one conversation: at most one streaming turn at a time, events
/// fanned out on a channel owned by this instance.
pub struct StreamCoordinator<T, R>
where
    T: Transport,
    R: Renderer,
{
    transport: T,
    renderer: R,
    chat: ChatSettings,
    extractor: DocumentExtractor,
    resolver: CitationResolver,
    conversation_id: String,
    state: Mutex<TurnState>,
    history: Mutex<Vec<ChatTurn>>,
    turns: AtomicU64,
    events: broadcast::Sender<ChatEvent>,
}

/// Holds the coordinator for the lifetime of one turn.
///
/// Only this guard moves the state back to `Idle`, and only on drop, after
/// history and the final event are published. `begin_turn` accepts a send
/// only from `Idle`, so a new turn can never start while another guard lives.
struct TurnGuard<'a> {
    state: &'a Mutex<TurnState>,
    events: &'a broadcast::Sender<ChatEvent>,
    turn: u64,
    settled: bool,
}

impl TurnGuard<'_> {
    /// The stream ended normally. The coordinator stays held until drop.
    fn complete(&mut self) {
        *lock(self.state) = TurnState::Completed;
        self.settled = true;
    }

    /// The turn failed and its `Failed` event is the caller's to emit.
    fn fail(&mut self) {
        self.settled = true;
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!(turn = self.turn, "turn abandoned before the stream closed");
            let _ = self.events.send(ChatEvent {
                turn: self.turn,
                kind: ChatEventKind::Failed { error: "turn abandoned".to_string() },
            });
        }
        *lock(self.state) = TurnState::Idle;
    }
}

impl<T, R> StreamCoordinator<T, R>
where
    T: Transport,
    R: Renderer,
{
    pub fn new(transport: T, renderer: R, settings: &Settings) -> Self {
        let (events, _) = broadcast::channel(settings.chat.event_capacity.max(1));
        Self {
            transport,
            renderer,
            chat: settings.chat.clone(),
            extractor: DocumentExtractor::new(settings.chat.source_step.clone()),
            resolver: CitationResolver::from_settings(&settings.citations),
            conversation_id: Uuid::new_v4().to_string(),
            state: Mutex::new(TurnState::Idle),
            history: Mutex::new(Vec::new()),
            turns: AtomicU64::new(0),
            events,
        }
    }

    #[must_use]
    pub fn with_conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = id.into();
        self
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> TurnState {
        *lock(&self.state)
    }

    /// True from the moment a send is accepted until its call returns.
    pub fn is_busy(&self) -> bool {
        self.state() != TurnState::Idle
    }

    pub fn history(&self) -> Vec<ChatTurn> {
        lock(&self.history).clone()
    }

    /// Start a turn for `text` and stream it to completion.
    ///
    /// Returns `Ignored` for blank input or while another turn holds the
    /// coordinator, including its completion or failure bookkeeping.
    /// A transport failure aborts the turn with `Error::Transport` after a
    /// `Failed` event; malformed individual ops are skipped.
    pub async fn send_message(&self, text: &str) -> Result<TurnOutcome> {
        if text.trim().is_empty() {
            return Ok(TurnOutcome::Ignored);
        }
        let Some(mut guard) = self.begin_turn() else {
            debug!(conversation_id = %self.conversation_id, "send ignored, a turn is already streaming");
            return Ok(TurnOutcome::Ignored);
        };
        let turn = guard.turn;

        self.emit(turn, ChatEventKind::Message(Message::user(text)));
        let request = StreamRequest::new(
            text,
            self.history(),
            &self.chat.llm,
            &self.conversation_id,
            self.extractor.source_step(),
        );
        info!(conversation_id = %self.conversation_id, turn, "turn started");

        match self.stream_turn(turn, &request).await {
            Ok(assembled) => {
                let skipped_ops = assembled.skipped_ops();
                let ai = assembled.extraction().answer_text.clone();
                lock(&self.history).push(ChatTurn { human: text.to_string(), ai });
                guard.complete();
                self.emit(turn, ChatEventKind::Completed);
                info!(conversation_id = %self.conversation_id, turn, skipped_ops, "turn completed");
                Ok(TurnOutcome::Completed { message: assembled.last_message, skipped_ops })
            }
            Err(e) => {
                guard.fail();
                warn!(conversation_id = %self.conversation_id, turn, error = %e, "turn failed");
                self.emit(turn, ChatEventKind::Failed { error: e.to_string() });
                Err(e)
            }
        }
    }

    fn begin_turn(&self) -> Option<TurnGuard<'_>> {
        let mut state = lock(&self.state);
        if *state != TurnState::Idle {
            return None;
        }
        *state = TurnState::Streaming;
        Some(TurnGuard {
            state: &self.state,
            events: &self.events,
            turn: self.turns.fetch_add(1, Ordering::SeqCst) + 1,
            settled: false,
        })
    }

    async fn stream_turn(&self, turn: u64, request: &StreamRequest) -> Result<Assembled> {
        let mut stream = match tokio::time::timeout(self.timeout(), self.transport.open_stream(request)).await {
            Ok(opened) => opened.map_err(into_transport)?,
            Err(_) => return Err(self.timed_out()),
        };
        let mut assembler = TurnAssembler::new(self.extractor.clone(), self.resolver);
        let mut last_message = None;
        let mut chunks = 0usize;
        while let Some(chunk) = self.next_chunk(&mut stream).await? {
            chunks += 1;
            if let Some(message) = assembler.absorb(&chunk, &self.renderer) {
                debug!(turn, chunks, len = message.content.len(), "emitting partial answer");
                self.emit(turn, ChatEventKind::Message(message.clone()));
                last_message = Some(message);
            }
        }
        Ok(Assembled { assembler, last_message })
    }

    /// The only suspension point of a turn.
    async fn next_chunk(&self, stream: &mut ChunkStream) -> Result<Option<PatchChunk>> {
        match tokio::time::timeout(self.timeout(), stream.next()).await {
            Ok(Some(chunk)) => chunk.map(Some).map_err(into_transport),
            Ok(None) => Ok(None),
            Err(_) => Err(self.timed_out()),
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.chat.timeout_ms)
    }

    fn timed_out(&self) -> Error {
        Error::Transport(format!("no response within {} ms", self.chat.timeout_ms))
    }

    fn emit(&self, turn: u64, kind: ChatEventKind) {
        if self.events.send(ChatEvent { turn, kind }).is_err() {
            debug!(turn, "no subscribers for chat event");
        }
    }
}

struct Assembled {
    assembler: TurnAssembler,
    last_message: Option<Message>,
}

impl Assembled {
    fn skipped_ops(&self) -> usize {
        self.assembler.skipped_ops()
    }

    fn extraction(&self) -> &Extraction {
        self.assembler.extraction()
    }
}

/// Anything that breaks the chunk stream counts as a transport failure.
fn into_transport(e: Error) -> Error {
    match e {
        Error::Transport(_) => e,
        other => Error::Transport(other.to_string()),
    }
}
