use std::path::Path;

use lopdf::Document;
use ragctx_core::error::ExtractError;
use tracing::debug;

/// Extract text page by page; pages that yield no text are skipped.
pub fn extract_pdf(path: &Path) -> Result<String, ExtractError> {
    let doc = Document::load(path).map_err(|e| ExtractError::Parse { path: path.to_path_buf(), reason: e.to_string() })?;

    let mut pages = Vec::new();
    for page_num in doc.get_pages().keys().copied() {
        match doc.extract_text(&[page_num]) {
            Ok(text) if !text.trim().is_empty() => pages.push(text),
            Ok(_) => debug!(path = %path.display(), page_num, "page has no text"),
            Err(e) => debug!(path = %path.display(), page_num, error = %e, "page text extraction failed"),
        }
    }
    Ok(pages.join("\n"))
}
