//! ragctx-embed
//!
//! Sentence embeddings for chunks and queries. [`BertEmbedder`] runs a local
//! BERT-family checkpoint through candle; [`FakeEmbedder`] is a deterministic
//! stand-in for tests and offline development. [`SharedEmbedder`] is the
//! process-wide handle that loads the model once and hands it out thereafter.

mod bert;
mod device;
pub mod pool;
mod shared;
mod tokenize;

use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use ragctx_core::config::{expand_path, EmbedSettings};
use ragctx_core::error::EmbedError;
use ragctx_core::traits::Embedder;
use tracing::info;
use twox_hash::XxHash64;

pub use bert::BertEmbedder;
pub use pool::masked_mean_l2;
pub use shared::SharedEmbedder;

/// Directory name of the default checkpoint (384-dim all-MiniLM-L6-v2).
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

pub(crate) fn inference_err(e: candle_core::Error) -> EmbedError { EmbedError::Inference(e.to_string()) }

/// Deterministic hashing embedder.
///
/// Each lowercase word and each of its character trigrams is hashed into a
/// signed bucket, so texts sharing words or word stems get positive cosine
/// similarity. A half-weight bias bucket keeps every vector non-zero.
pub struct FakeEmbedder { dim: usize }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        self.add_feature(&mut v, "<s>", 0.5);
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let word = word.to_lowercase();
            self.add_feature(&mut v, &format!("w:{word}"), 1.0);
            let padded: Vec<char> = format!("#{word}#").chars().collect();
            for tri in padded.windows(3) {
                self.add_feature(&mut v, &tri.iter().collect::<String>(), 1.0);
            }
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        for x in &mut v { *x /= norm; }
        v
    }

    fn add_feature(&self, v: &mut [f32], feature: &str, weight: f32) {
        let mut hasher = XxHash64::with_seed(0);
        feature.hash(&mut hasher);
        let h = hasher.finish();
        let idx = (h % self.dim as u64) as usize;
        let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
        v[idx] += sign * weight;
    }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn max_len(&self) -> usize { 512 }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

fn use_fake_from_env() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Build the embedder described by `settings`. `APP_USE_FAKE_EMBEDDINGS=1`
/// forces the fake embedder regardless of settings.
pub fn get_default_embedder(settings: &EmbedSettings) -> Result<Box<dyn Embedder>, EmbedError> {
    if settings.use_fake || use_fake_from_env() {
        info!(dim = settings.fake_dim, "using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(settings.fake_dim)));
    }
    let model_dir = resolve_model_dir(settings.model_dir.as_deref())?;
    Ok(Box::new(BertEmbedder::load(&model_dir, settings.max_len)?))
}

/// Locate the model directory: configured path, `APP_MODEL_DIR`, `MODEL_DIR`,
/// then `models/<DEFAULT_MODEL>` relative to the working directory or its parent.
pub fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf, EmbedError> {
    if let Some(dir) = configured {
        let p = expand_path(dir);
        if p.exists() { info!(path = %p.display(), "using configured model dir"); return Ok(p); }
        return Err(EmbedError::ModelLoad(format!("Configured model dir does not exist: {}", p.display())));
    }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = expand_path(dir);
            if p.exists() { info!(path = %p.display(), "using {var}"); return Ok(p); }
        }
    }
    for base in [Path::new("models"), Path::new("../models")] {
        let p = base.join(DEFAULT_MODEL);
        if p.exists() { info!(path = %p.display(), "using model dir"); return Ok(p); }
    }
    Err(EmbedError::ModelLoad(format!("Could not locate {DEFAULT_MODEL} model directory")))
}
