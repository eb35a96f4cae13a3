use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Per-document extraction failure.
///
/// Always recovered by the extractor: the document contributes no text and
/// the rest of the batch carries on.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Unsupported document type: {path}")]
    Unsupported { path: PathBuf },
}

/// Embedding model failure. Fatal for the whole request.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("Failed to load embedding model: {0}")]
    ModelLoad(String),

    #[error("Tokenization failed: {0}")]
    Tokenize(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid embedding output: {0}")]
    InvalidOutput(String),
}
