//! ragctx-extract
//!
//! Plain-text extraction for uploaded documents. Dispatch is decided by
//! [`Document::media_kind`]: declared media type first, file extension second.
//! Failures are per document; [`TextExtractor::extract`] turns them into an
//! empty contribution so one bad upload never sinks the batch.

mod docx;
mod pdf;
mod text;

pub use docx::extract_docx;
pub use pdf::extract_pdf;
pub use text::extract_plain_text;

use ragctx_core::error::ExtractError;
use ragctx_core::traits::TextExtractor;
use ragctx_core::types::{Document, MediaKind};
use tracing::debug;

/// Extractor for the PDF, DOCX and plain-text formats.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentExtractor;

impl DocumentExtractor {
    pub fn new() -> Self { Self }
}

impl TextExtractor for DocumentExtractor {
    fn try_extract(&self, doc: &Document) -> Result<String, ExtractError> {
        let kind = doc
            .media_kind()
            .ok_or_else(|| ExtractError::Unsupported { path: doc.path.clone() })?;
        debug!(path = %doc.path.display(), ?kind, "extracting document");
        match kind {
            MediaKind::Pdf => extract_pdf(&doc.path),
            MediaKind::Docx => extract_docx(&doc.path),
            MediaKind::PlainText => extract_plain_text(&doc.path),
        }
    }
}
