use std::fs;
use std::path::Path;

use ragctx_core::error::ExtractError;

/// Read a file as UTF-8, dropping any byte sequences that do not decode.
pub fn extract_plain_text(path: &Path) -> Result<String, ExtractError> {
    let bytes = fs::read(path).map_err(|source| ExtractError::Io { path: path.to_path_buf(), source })?;
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    Ok(text)
}
