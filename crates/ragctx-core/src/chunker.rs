//! Word-window chunking with overlap.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static HORIZONTAL_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").expect("valid regex"));
static NEWLINE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Window size and overlap, both counted in whitespace-delimited words.
///
/// `overlap < max_tokens` always holds for a constructed value, which is what
/// guarantees the sliding window advances. Deserialization goes through
/// [`ChunkingConfig::new`] as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawChunking")]
pub struct ChunkingConfig {
    max_tokens: usize,
    overlap: usize,
}

#[derive(Deserialize)]
struct RawChunking {
    max_tokens: usize,
    overlap: usize,
}

impl TryFrom<RawChunking> for ChunkingConfig {
    type Error = Error;

    fn try_from(raw: RawChunking) -> Result<Self> {
        Self::new(raw.max_tokens, raw.overlap)
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_tokens: 400, overlap: 50 }
    }
}

impl ChunkingConfig {
    pub fn new(max_tokens: usize, overlap: usize) -> Result<Self> {
        if max_tokens == 0 {
            return Err(Error::InvalidConfig("max_tokens must be at least 1".to_string()));
        }
        if overlap >= max_tokens {
            return Err(Error::InvalidConfig(format!(
                "overlap ({overlap}) must be smaller than max_tokens ({max_tokens})"
            )));
        }
        Ok(Self { max_tokens, overlap })
    }

    /// Profile used for uploaded documents: larger windows, wider overlap.
    pub fn documents() -> Self {
        Self { max_tokens: 450, overlap: 80 }
    }

    pub fn max_tokens(&self) -> usize { self.max_tokens }

    pub fn overlap(&self) -> usize { self.overlap }
}

/// Collapse runs of spaces/tabs to one space and runs of three or more
/// newlines to a single blank line, then trim.
pub fn clean(text: &str) -> String {
    let t = HORIZONTAL_WS.replace_all(text, " ");
    let t = NEWLINE_RUNS.replace_all(&t, "\n\n");
    t.trim().to_string()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self { Self { config } }

    pub fn config(&self) -> ChunkingConfig { self.config }

    /// Split `text` into ordered chunks of at most `max_tokens` words where
    /// consecutive chunks share `overlap` words.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let cleaned = clean(text);
        if cleaned.is_empty() {
            return Vec::new();
        }
        let words: Vec<&str> = cleaned.split_whitespace().collect();
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + self.config.max_tokens).min(words.len());
            let chunk = words[start..end].join(" ");
            if !chunk.is_empty() {
                chunks.push(chunk);
            }
            if end == words.len() {
                break;
            }
            start = end.saturating_sub(self.config.overlap);
        }
        chunks
    }
}
