//! Domain types shared by the extraction, embedding and retrieval crates.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// An uploaded file handed to the context builder.
///
/// - `path`: local path the file-storage layer wrote the upload to
/// - `media_type`: declared type from the upload (MIME such as
///   `application/pdf`, or a short form like `pdf`, `docx`, `plain-text`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub path: PathBuf,
    pub media_type: Option<String>,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), media_type: None }
    }

    pub fn with_media_type(path: impl Into<PathBuf>, media_type: impl Into<String>) -> Self {
        Self { path: path.into(), media_type: Some(media_type.into()) }
    }

    /// Resolve the kind of document: the declared media type wins when it is
    /// recognised, otherwise the file extension decides.
    pub fn media_kind(&self) -> Option<MediaKind> {
        self.media_type
            .as_deref()
            .and_then(MediaKind::from_declared)
            .or_else(|| MediaKind::from_path(&self.path))
    }
}

/// Document formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Pdf,
    Docx,
    PlainText,
}

impl MediaKind {
    pub fn from_declared(media_type: &str) -> Option<Self> {
        let m = media_type.trim().to_ascii_lowercase();
        if m.is_empty() {
            return None;
        }
        if m.contains("pdf") {
            Some(Self::Pdf)
        } else if m.contains("word") || m.contains("docx") {
            // also covers application/vnd.openxmlformats-officedocument.wordprocessingml.document
            Some(Self::Docx)
        } else if m.starts_with("text/") || m == "text" || m == "plain-text" || m == "txt" {
            Some(Self::PlainText)
        } else {
            None
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" | "text" | "md" | "markdown" | "csv" | "log" => Some(Self::PlainText),
            _ => None,
        }
    }
}

/// How extracted texts are turned into chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkScope {
    /// All document texts are joined with a blank line and chunked once, so a
    /// chunk may straddle two documents.
    #[default]
    Concatenated,
    /// Each document is chunked on its own and the chunk lists are appended.
    PerDocument,
}

/// One ranked result of a similarity search.
///
/// `rank` starts at 1. `chunk_index` is the chunk's position in the index.
/// `score` is the inner product of unit vectors, so it lies in [-1, 1] and
/// higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub rank: usize,
    pub chunk_index: usize,
    pub text: String,
    pub score: f32,
}
