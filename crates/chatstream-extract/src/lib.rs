//! Pulls the answer text, sources and run id out of a streamed run document.
//!
//! Extraction runs after every chunk, so the document may be any prefix of
//! the patch sequence. Nothing here fails: a missing branch or a branch of
//! the wrong shape is simply "not known yet".

use chatstream_core::error::{Error, Result};
use chatstream_core::types::Source;
use serde_json::Value;

pub const DEFAULT_SOURCE_STEP: &str = "FindDocs";

const TEXT_FIELD: &str = "streamed_output_str";
const CHUNKS_FIELD: &str = "streamed_output";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub answer_text: String,
    /// `None` until the retrieval step has produced its output.
    pub sources: Option<Vec<Source>>,
    pub run_id: Option<String>,
}

impl Extraction {
    /// Whether the text is worth rendering yet.
    pub fn has_text(&self) -> bool {
        !self.answer_text.trim().is_empty()
    }

    /// Keep a run id or source list seen earlier in the stream when this
    /// extraction does not see one.
    #[must_use]
    pub fn carry_forward(mut self, previous: &Extraction) -> Self {
        if self.run_id.is_none() {
            self.run_id.clone_from(&previous.run_id);
        }
        if self.sources.is_none() {
            self.sources.clone_from(&previous.sources);
        }
        self
    }
}

#[derive(Debug, Clone)]
pub struct DocumentExtractor {
    source_step: String,
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_STEP)
    }
}

impl DocumentExtractor {
    pub fn new(source_step: impl Into<String>) -> Self {
        Self { source_step: source_step.into() }
    }

    pub fn source_step(&self) -> &str {
        &self.source_step
    }

    pub fn extract(&self, document: &Value) -> Extraction {
        Extraction {
            answer_text: answer_text(document),
            sources: self.sources(document),
            run_id: document.get("id").and_then(Value::as_str).map(str::to_owned),
        }
    }

    fn sources(&self, document: &Value) -> Option<Vec<Source>> {
        let path = ["logs", self.source_step.as_str(), "final_output", "output"];
        match absent_on_mismatch(lookup(document, &path))? {
            Value::Array(entries) => Some(entries.iter().map(source_from_entry).collect()),
            _ => None,
        }
    }
}

fn answer_text(document: &Value) -> String {
    if let Some(Value::String(text)) = document.get(TEXT_FIELD) {
        return text.clone();
    }
    match absent_on_mismatch(lookup(document, &[CHUNKS_FIELD])) {
        // Structured events interleave with text chunks; only strings count.
        Some(Value::Array(chunks)) => chunks.iter().filter_map(Value::as_str).collect(),
        _ => String::new(),
    }
}

fn source_from_entry(entry: &Value) -> Source {
    let field = |name: &str| {
        entry
            .get("metadata")
            .and_then(|m| m.get(name))
            .and_then(Value::as_str)
            .map(str::to_owned)
    };
    Source { url: field("source"), title: field("title") }
}

/// Walk object keys. A missing key or a `null` on the way is `Ok(None)`;
/// descending into anything other than an object is a mismatch.
fn lookup<'a>(document: &'a Value, path: &[&str]) -> Result<Option<&'a Value>> {
    let mut cur = document;
    for (depth, key) in path.iter().enumerate() {
        cur = match cur {
            Value::Object(map) => match map.get(*key) {
                Some(next) => next,
                None => return Ok(None),
            },
            Value::Null => return Ok(None),
            _ => {
                return Err(Error::ExtractionMismatch {
                    path: format!("/{}", path[..depth].join("/")),
                    expected: "object",
                })
            }
        };
    }
    Ok(Some(cur))
}

fn absent_on_mismatch(found: Result<Option<&Value>>) -> Option<&Value> {
    match found {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "treating mismatched branch as absent");
            None
        }
    }
}
