use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::feedback::{FeedbackReceipt, FeedbackRequest};
use crate::patch::PatchChunk;
use crate::types::StreamRequest;

/// Finite, ordered stream of patch chunks for one turn.
pub type ChunkStream = BoxStream<'static, Result<PatchChunk>>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a stream for one turn. Each element is consumed at most once.
    async fn open_stream(&self, request: &StreamRequest) -> Result<ChunkStream>;
}

pub trait Renderer: Send + Sync {
    /// Markdown to sanitized HTML.
    fn render(&self, markdown: &str) -> String;
    /// Sanitize an already built HTML fragment.
    fn sanitize(&self, html: &str) -> String;
}

#[async_trait]
pub trait FeedbackSink: Send + Sync {
    async fn submit(&self, request: &FeedbackRequest) -> Result<FeedbackReceipt>;
}

/// Treats markdown as plain text and escapes everything HTML-significant.
#[derive(Debug, Clone, Copy, Default)]
pub struct EscapingRenderer;

impl EscapingRenderer {
    fn escape(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for ch in text.chars() {
            match ch {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&#39;"),
                c => out.push(c),
            }
        }
        out
    }
}

impl Renderer for EscapingRenderer {
    fn render(&self, markdown: &str) -> String {
        Self::escape(markdown)
    }

    // Input is a slice of `render` output and is already escaped.
    fn sanitize(&self, html: &str) -> String {
        html.to_string()
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn open_stream(&self, request: &StreamRequest) -> Result<ChunkStream> {
        (**self).open_stream(request).await
    }
}
