//! In-process transport that replays a fixed list of chunks.
//!
//! Used by the replay binary to drive a coordinator from a recorded
//! `streamLog` capture, and by tests that need deterministic streams.

use std::io::BufRead;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chatstream_core::error::{Error, Result};
use chatstream_core::patch::PatchChunk;
use chatstream_core::traits::{ChunkStream, Transport};
use chatstream_core::types::StreamRequest;
use futures::StreamExt;

#[derive(Debug, Clone)]
pub enum ScriptItem {
    Chunk(PatchChunk),
    /// Break the stream with a transport error at this position.
    Fail(String),
}

/// Every `open_stream` call replays the same script.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    items: Vec<ScriptItem>,
    open_error: Option<String>,
    requests: Mutex<Vec<StreamRequest>>,
}

impl ScriptedTransport {
    pub fn new(chunks: impl IntoIterator<Item = PatchChunk>) -> Self {
        Self::from_items(chunks.into_iter().map(ScriptItem::Chunk))
    }

    pub fn from_items(items: impl IntoIterator<Item = ScriptItem>) -> Self {
        Self { items: items.into_iter().collect(), ..Self::default() }
    }

    /// One chunk per non-blank line.
    pub fn from_jsonl(reader: impl BufRead) -> Result<Self> {
        let mut chunks = Vec::new();
        for (n, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| Error::Transport(format!("read line {}: {e}", n + 1)))?;
            if line.trim().is_empty() {
                continue;
            }
            chunks.push(PatchChunk::from_json_line(&line)?);
        }
        Ok(Self::new(chunks))
    }

    /// Fail every `open_stream` call before any chunk is produced.
    #[must_use]
    pub fn failing_open(mut self, reason: impl Into<String>) -> Self {
        self.open_error = Some(reason.into());
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<StreamRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open_stream(&self, request: &StreamRequest) -> Result<ChunkStream> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).push(request.clone());
        if let Some(reason) = &self.open_error {
            return Err(Error::Transport(reason.clone()));
        }
        let items: Vec<Result<PatchChunk>> = self
            .items
            .iter()
            .cloned()
            .map(|item| match item {
                ScriptItem::Chunk(chunk) => Ok(chunk),
                ScriptItem::Fail(reason) => Err(Error::Transport(reason)),
            })
            .collect();
        Ok(futures::stream::iter(items).boxed())
    }
}
