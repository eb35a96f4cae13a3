//! ragctx-vector
//!
//! Flat, exact inner-product index over unit-length chunk embeddings. Built
//! once per request and read-only afterwards; every query is compared against
//! every stored vector (O(n·d)).

use ragctx_core::error::{EmbedError, Error, Result};
use ragctx_core::traits::Embedder;
use ragctx_core::types::RetrievalHit;
use tracing::debug;

/// Allowed deviation of an embedding's L2 norm from 1.
const NORM_TOLERANCE: f32 = 1e-2;

/// Chunks plus a dense row-major matrix of their embeddings.
///
/// Row `i` of the matrix embeds `chunks[i]`; all rows share one dimension.
#[derive(Debug, Clone, Default)]
pub struct FlatIndex {
    chunks: Vec<String>,
    data: Vec<f32>,
    dim: usize,
}

impl FlatIndex {
    /// Embed `chunks` and index them. An empty chunk list never touches the model.
    pub fn build(chunks: Vec<String>, embedder: &dyn Embedder) -> std::result::Result<Self, EmbedError> {
        if chunks.is_empty() {
            return Ok(Self { chunks, data: Vec::new(), dim: embedder.dim() });
        }
        let vectors = embedder.embed_batch(&chunks)?;
        check_embeddings(&vectors, chunks.len())?;
        debug!(chunks = chunks.len(), dim = vectors[0].len(), "built flat index");
        Self::from_parts(chunks, vectors).map_err(|e| EmbedError::InvalidOutput(e.to_string()))
    }

    /// Assemble an index from pre-computed vectors.
    pub fn from_parts(chunks: Vec<String>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(Error::Operation(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        let dim = vectors.first().map_or(0, Vec::len);
        if !vectors.is_empty() && dim == 0 {
            return Err(Error::Operation("vectors have zero dimension".to_string()));
        }
        let mut data = Vec::with_capacity(vectors.len() * dim);
        for (i, v) in vectors.iter().enumerate() {
            if v.len() != dim {
                return Err(Error::Operation(format!("vector {i} has dimension {} (expected {dim})", v.len())));
            }
            data.extend_from_slice(v);
        }
        Ok(Self { chunks, data, dim })
    }

    pub fn len(&self) -> usize { self.chunks.len() }

    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }

    pub fn dim(&self) -> usize { self.dim }

    pub fn chunks(&self) -> &[String] { &self.chunks }

    /// Embed `query` and return the `k` best chunks.
    pub fn search(&self, query: &str, k: usize, embedder: &dyn Embedder) -> std::result::Result<Vec<RetrievalHit>, EmbedError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let q = embedder.embed_batch(&[query.to_string()])?;
        check_embeddings(&q, 1)?;
        self.search_vec(&q[0], k).map_err(|e| EmbedError::InvalidOutput(e.to_string()))
    }

    /// Rank every chunk by inner product with `query_vec`, best first. Equal
    /// scores keep insertion order. Returns at most `min(k, len)` hits.
    pub fn search_vec(&self, query_vec: &[f32], k: usize) -> Result<Vec<RetrievalHit>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query_vec.len() != self.dim {
            return Err(Error::Operation(format!(
                "query has dimension {} but index has {}",
                query_vec.len(),
                self.dim
            )));
        }
        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dim)
            .map(|row| row.iter().zip(query_vec).map(|(a, b)| a * b).sum::<f32>())
            .enumerate()
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(rank, (chunk_index, score))| RetrievalHit {
                rank: rank + 1,
                chunk_index,
                text: self.chunks[chunk_index].clone(),
                score,
            })
            .collect())
    }
}

/// Reject model output that would corrupt similarity scores: wrong count,
/// ragged dimensions, non-finite values or vectors that are not unit length.
fn check_embeddings(vectors: &[Vec<f32>], expected: usize) -> std::result::Result<(), EmbedError> {
    if vectors.len() != expected {
        return Err(EmbedError::InvalidOutput(format!("expected {expected} vectors, got {}", vectors.len())));
    }
    let dim = vectors.first().map_or(0, Vec::len);
    for (i, v) in vectors.iter().enumerate() {
        if v.is_empty() || v.len() != dim {
            return Err(EmbedError::InvalidOutput(format!("vector {i} has dimension {} (expected {dim})", v.len())));
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(EmbedError::InvalidOutput(format!("vector {i} has non-finite components")));
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if (norm - 1.0).abs() > NORM_TOLERANCE {
            return Err(EmbedError::InvalidOutput(format!("vector {i} is not unit length (norm={norm})")));
        }
    }
    Ok(())
}
