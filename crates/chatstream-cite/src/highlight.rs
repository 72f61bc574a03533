use chatstream_core::types::AnswerSegment;

/// Which deduplicated source is hovered, if any.
///
/// Updates return a new value instead of mutating, so the state can be
/// threaded through a render call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Highlight(Option<usize>);

impl Highlight {
    pub fn none() -> Self {
        Self(None)
    }

    #[must_use]
    pub fn on_hover(self, source_index: usize) -> Self {
        Self(Some(source_index))
    }

    #[must_use]
    pub fn on_unhover(self) -> Self {
        Self(None)
    }

    pub fn current(self) -> Option<usize> {
        self.0
    }

    pub fn is_highlighted(self, source_index: usize) -> bool {
        self.0 == Some(source_index)
    }

    /// One flag per source; at most one is `true`.
    pub fn states(self, len: usize) -> Vec<bool> {
        (0..len).map(|i| self.is_highlighted(i)).collect()
    }

    /// Re-flag already resolved citation segments for this hover state.
    pub fn apply(self, segments: &[AnswerSegment]) -> Vec<AnswerSegment> {
        segments
            .iter()
            .map(|seg| match seg {
                AnswerSegment::Citation { source_index, source, .. } => AnswerSegment::Citation {
                    source_index: *source_index,
                    source: source.clone(),
                    highlighted: self.is_highlighted(*source_index),
                },
                text @ AnswerSegment::Text { .. } => text.clone(),
            })
            .collect()
    }
}
