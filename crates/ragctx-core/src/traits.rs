use tracing::warn;

use crate::error::{EmbedError, ExtractError};
use crate::types::Document;

/// Maps text to unit-length dense vectors.
///
/// `embed_batch` returns exactly one vector per input, in input order, all of
/// length `dim()`. Implementations report failures instead of returning
/// placeholder vectors.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;
}

/// Turns a stored document into plain text.
pub trait TextExtractor: Send + Sync {
    fn try_extract(&self, doc: &Document) -> Result<String, ExtractError>;

    /// Infallible variant: a failed document contributes no text.
    fn extract(&self, doc: &Document) -> String {
        match self.try_extract(doc) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %doc.path.display(), error = %e, "text extraction failed");
                String::new()
            }
        }
    }
}
