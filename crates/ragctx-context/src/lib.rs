//! ragctx-context
//!
//! Builds the grounding context for a generation request: extract every
//! uploaded document, chunk the text, embed and index the chunks, then rank
//! them against the query and format the best `top_k` as one text block.
//!
//! Extraction failures are absorbed per document. Embedding failures abort the
//! request with [`ContextError::Embedding`], so the caller can fall back to an
//! ungrounded generation path. No text at all is not an error: the context is
//! simply empty.

use std::sync::Arc;

use ragctx_core::chunker::{Chunker, ChunkingConfig};
use ragctx_core::config::RagSettings;
use ragctx_core::error::EmbedError;
use ragctx_core::sanitize::{sanitize_query, MAX_QUERY_CHARS};
use ragctx_core::traits::TextExtractor;
use ragctx_core::types::{ChunkScope, Document, RetrievalHit};
use ragctx_embed::SharedEmbedder;
use ragctx_extract::DocumentExtractor;
use ragctx_vector::FlatIndex;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Message shown to end users for any processing failure.
pub const USER_FACING_FAILURE: &str = "failed to process documents";

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("context task failed: {0}")]
    Join(String),
}

impl ContextError {
    /// Text safe to show an end user; internal detail stays in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidRequest(msg) => msg.clone(),
            Self::Embedding(_) | Self::Join(_) => USER_FACING_FAILURE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextOptions {
    pub chunking: ChunkingConfig,
    pub top_k: usize,
    pub scope: ChunkScope,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self { chunking: ChunkingConfig::documents(), top_k: 6, scope: ChunkScope::Concatenated }
    }
}

impl ContextOptions {
    pub fn from_settings(settings: &RagSettings) -> ragctx_core::error::Result<Self> {
        Ok(Self { chunking: settings.chunking()?, top_k: settings.top_k, scope: settings.scope })
    }
}

#[derive(Clone)]
pub struct ContextBuilder {
    extractor: Arc<dyn TextExtractor>,
    embedder: SharedEmbedder,
    options: ContextOptions,
}

impl ContextBuilder {
    pub fn new(extractor: Arc<dyn TextExtractor>, embedder: SharedEmbedder, options: ContextOptions) -> Self {
        Self { extractor, embedder, options }
    }

    /// Builder using [`DocumentExtractor`] for PDF, DOCX and plain text.
    pub fn with_default_extractor(embedder: SharedEmbedder, options: ContextOptions) -> Self {
        Self::new(Arc::new(DocumentExtractor::new()), embedder, options)
    }

    pub fn options(&self) -> &ContextOptions { &self.options }

    /// Context for `query` using the configured `top_k`.
    pub fn build_context(&self, docs: &[Document], query: &str) -> Result<String, ContextError> {
        self.build_context_with_k(docs, query, self.options.top_k)
    }

    pub fn build_context_with_k(&self, docs: &[Document], query: &str, top_k: usize) -> Result<String, ContextError> {
        let hits = self.retrieve(docs, query, top_k)?;
        let context = format_context(&hits);
        info!(hits = hits.len(), chars = context.len(), "built RAG context");
        Ok(context)
    }

    /// Ranked hits without formatting. Empty when the documents yield no text.
    pub fn retrieve(&self, docs: &[Document], query: &str, top_k: usize) -> Result<Vec<RetrievalHit>, ContextError> {
        if top_k == 0 {
            return Err(ContextError::InvalidRequest("top_k must be at least 1".to_string()));
        }
        let chunks = self.chunk_documents(docs);
        if chunks.is_empty() {
            info!(documents = docs.len(), "no text extracted; context is empty");
            return Ok(Vec::new());
        }

        let embedder = self.embedder.get()?;
        let index = FlatIndex::build(chunks, embedder.as_ref())?;
        let query = sanitize_query(query, MAX_QUERY_CHARS);
        let hits = index.search(&query, top_k, embedder.as_ref())?;
        debug!(indexed = index.len(), hits = hits.len(), "search complete");
        Ok(hits)
    }

    /// Extract every document and split the text per the configured scope.
    pub fn chunk_documents(&self, docs: &[Document]) -> Vec<String> {
        let texts: Vec<String> = docs
            .iter()
            .filter_map(|doc| {
                let text = self.extractor.extract(doc);
                if text.trim().is_empty() {
                    warn!(path = %doc.path.display(), "empty text from document");
                    None
                } else {
                    Some(text)
                }
            })
            .collect();

        let chunker = Chunker::new(self.options.chunking);
        match self.options.scope {
            ChunkScope::Concatenated => chunker.chunk(&texts.join("\n\n")),
            ChunkScope::PerDocument => texts.iter().flat_map(|t| chunker.chunk(t)).collect(),
        }
    }

    /// Runs [`build_context`](Self::build_context) on tokio's blocking pool so
    /// model inference does not stall the async executor.
    pub async fn build_context_async(&self, docs: Vec<Document>, query: String) -> Result<String, ContextError> {
        let builder = self.clone();
        tokio::task::spawn_blocking(move || builder.build_context(&docs, &query))
            .await
            .map_err(|e| ContextError::Join(e.to_string()))?
    }
}

/// `[CHUNK#<rank> score=<score>]` header over each chunk, blocks separated by
/// a blank line.
pub fn format_context(hits: &[RetrievalHit]) -> String {
    hits.iter()
        .map(|h| format!("[CHUNK#{} score={:.3}]\n{}", h.rank, h.score, h.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}
