//! Per-turn assembly: patch chunk in, renderable assistant message out.
//!
//! A `TurnAssembler` owns the running document of exactly one turn. It does
//! no I/O, so the whole apply/extract/dedup/resolve pipeline can be driven
//! synchronously in tests.

use chatstream_cite::{dedup, CitationResolver, Highlight};
use chatstream_core::patch::PatchChunk;
use chatstream_core::traits::Renderer;
use chatstream_core::types::Message;
use chatstream_extract::{DocumentExtractor, Extraction};
use chatstream_patch::apply_in_place;
use serde_json::{Map, Value};

pub struct TurnAssembler {
    extractor: DocumentExtractor,
    resolver: CitationResolver,
    document: Value,
    extraction: Extraction,
    skipped_ops: usize,
}

impl TurnAssembler {
    pub fn new(extractor: DocumentExtractor, resolver: CitationResolver) -> Self {
        Self {
            extractor,
            resolver,
            document: Value::Object(Map::new()),
            extraction: Extraction::default(),
            skipped_ops: 0,
        }
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Latest extraction, with run id and sources carried forward.
    pub fn extraction(&self) -> &Extraction {
        &self.extraction
    }

    /// Ops dropped so far because their path could not be resolved.
    pub fn skipped_ops(&self) -> usize {
        self.skipped_ops
    }

    /// Apply one chunk and build the message it yields, if the answer has
    /// any text yet.
    pub fn absorb<R: Renderer + ?Sized>(&mut self, chunk: &PatchChunk, renderer: &R) -> Option<Message> {
        for op in &chunk.ops {
            if let Err(e) = apply_in_place(&mut self.document, op) {
                self.skipped_ops += 1;
                tracing::warn!(error = %e, "skipping unresolvable patch op");
            }
        }
        self.extraction = self.extractor.extract(&self.document).carry_forward(&self.extraction);
        if !self.extraction.has_text() {
            return None;
        }

        let content = renderer.render(&self.extraction.answer_text).trim().to_string();
        let raw_sources = self.extraction.sources.clone().unwrap_or_default();
        let deduped = dedup(&raw_sources);
        let resolution = self.resolver.resolve_with_report(&content, &deduped, Highlight::none(), renderer);
        if !resolution.unresolved.is_empty() {
            tracing::debug!(
                unresolved = resolution.unresolved.len(),
                sources = deduped.filtered.len(),
                "citation markers left as text"
            );
        }

        Some(Message::assistant(
            content,
            self.extraction.run_id.clone(),
            self.extraction.sources.clone(),
            resolution.segments,
        ))
    }
}
