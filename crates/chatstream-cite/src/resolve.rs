//! Split answer text into prose and citation segments.
//!
//! Markers look like `[^1]` with optional `$`, `{}` and trailing `^`
//! decorations (`[1]`, `[^{1}]`, `[$1]`, `[^1^]`). A marker that does not
//! resolve to a deduplicated source stays in the text verbatim.

use std::sync::LazyLock;

use chatstream_core::config::CitationSettings;
use chatstream_core::traits::Renderer;
use chatstream_core::types::{AnswerSegment, Source};
use regex::Regex;

use crate::dedup::DedupResult;
use crate::highlight::Highlight;

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\^?\$?\{?(\d+)\}?\^?\]").expect("citation pattern is valid"));

/// A marker located in the text by byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CitationMarker {
    pub start: usize,
    pub len: usize,
    pub number: usize,
}

impl CitationMarker {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Markers in order of appearance. Numbers too large for `usize` are not
/// treated as markers.
pub fn find_markers(text: &str) -> Vec<CitationMarker> {
    MARKER
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let number = caps.get(1)?.as_str().parse().ok()?;
            Some(CitationMarker { start: whole.start(), len: whole.len(), number })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexBase {
    Zero,
    One,
}

impl IndexBase {
    fn original_index(self, number: usize) -> Option<usize> {
        match self {
            IndexBase::Zero => Some(number),
            IndexBase::One => number.checked_sub(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// The number has no entry in the index map.
    UnknownSource,
    /// The index map points past the deduplicated list.
    OutOfRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnresolvedCitation {
    pub marker: CitationMarker,
    pub reason: UnresolvedReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub segments: Vec<AnswerSegment>,
    pub unresolved: Vec<UnresolvedCitation>,
}

#[derive(Debug, Clone, Copy)]
pub struct CitationResolver {
    base: IndexBase,
}

impl Default for CitationResolver {
    fn default() -> Self {
        Self::new(IndexBase::One)
    }
}

impl CitationResolver {
    pub fn new(base: IndexBase) -> Self {
        Self { base }
    }

    pub fn from_settings(settings: &CitationSettings) -> Self {
        Self::new(if settings.index_base == 0 { IndexBase::Zero } else { IndexBase::One })
    }

    /// Deduplicated index for a marker number.
    pub fn resolve_index(&self, number: usize, dedup: &DedupResult) -> Result<usize, UnresolvedReason> {
        self.lookup(number, dedup).map(|(idx, _)| idx)
    }

    fn lookup<'d>(&self, number: usize, dedup: &'d DedupResult) -> Result<(usize, &'d Source), UnresolvedReason> {
        let original = self
            .base
            .original_index(number)
            .filter(|&original| original < dedup.index_map.len())
            .ok_or(UnresolvedReason::UnknownSource)?;
        dedup.source_for(original).ok_or(UnresolvedReason::OutOfRange)
    }

    pub fn resolve<R: Renderer + ?Sized>(
        &self,
        text: &str,
        dedup: &DedupResult,
        highlight: Highlight,
        renderer: &R,
    ) -> Vec<AnswerSegment> {
        self.resolve_with_report(text, dedup, highlight, renderer).segments
    }

    pub fn resolve_with_report<R: Renderer + ?Sized>(
        &self,
        text: &str,
        dedup: &DedupResult,
        highlight: Highlight,
        renderer: &R,
    ) -> Resolution {
        let mut out = Resolution::default();
        let mut prev = 0usize;
        for marker in find_markers(text) {
            let (source_index, source) = match self.lookup(marker.number, dedup) {
                Ok(found) => found,
                Err(reason) => {
                    out.unresolved.push(UnresolvedCitation { marker, reason });
                    continue;
                }
            };
            if marker.start > prev {
                out.segments.push(AnswerSegment::Text { html: renderer.sanitize(&text[prev..marker.start]) });
            }
            out.segments.push(AnswerSegment::Citation {
                source_index,
                source: source.clone(),
                highlighted: highlight.is_highlighted(source_index),
            });
            prev = marker.end();
        }
        if prev < text.len() {
            out.segments.push(AnswerSegment::Text { html: renderer.sanitize(&text[prev..]) });
        }
        out
    }
}
