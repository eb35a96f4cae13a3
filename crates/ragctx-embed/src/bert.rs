use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use ragctx_core::error::EmbedError;
use ragctx_core::traits::Embedder;
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;
use crate::inference_err;

/// Texts per forward pass.
const BATCH_SIZE: usize = 32;

/// Sentence embedder over a BERT-family checkpoint (e.g. all-MiniLM-L6-v2)
/// with masked mean pooling and L2 normalisation.
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    pad_id: u32,
}

impl BertEmbedder {
    /// Load `tokenizer.json`, `config.json` and weights (`model.safetensors`,
    /// else `pytorch_model.bin`) from `model_dir`.
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self, EmbedError> {
        let started = Instant::now();
        let device = select_device();
        info!(model_dir = %model_dir.display(), "loading sentence embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e)))?;
        let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0);

        let config_path = model_dir.join("config.json");
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to read {}: {}", config_path.display(), e)))?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| EmbedError::ModelLoad(format!("Invalid {}: {}", config_path.display(), e)))?;
        let dim = value
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .and_then(|d| usize::try_from(d).ok())
            .ok_or_else(|| EmbedError::ModelLoad(format!("{} has no hidden_size", config_path.display())))?;
        let config: BertConfig = serde_json::from_value(value)
            .map_err(|e| EmbedError::ModelLoad(format!("Unsupported model config: {e}")))?;

        let vb = load_weights(model_dir, &device)?;
        let model = BertModel::load(vb, &config).map_err(|e| EmbedError::ModelLoad(format!("Failed to build BERT model: {e}")))?;

        info!(dim, max_len, elapsed_ms = started.elapsed().as_millis() as u64, "embedding model ready");
        Ok(Self { model, tokenizer, device, dim, max_len, pad_id })
    }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let batch = tokenize_batch(&self.tokenizer, texts, self.max_len, self.pad_id, &self.device)?;
        let hidden = self
            .model
            .forward(&batch.input_ids, &batch.token_type_ids, Some(&batch.attention_mask))
            .map_err(inference_err)?;
        let pooled = masked_mean_l2(&hidden, &batch.attention_mask).map_err(inference_err)?;
        pooled.to_device(&Device::Cpu).and_then(|t| t.to_vec2::<f32>()).map_err(inference_err)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>, EmbedError> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        debug!(path = %safetensors.display(), "mapping safetensors weights");
        // SAFETY: the weights file is only read, and stays in place for the process lifetime.
        return unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, device) }
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to load weights: {e}")));
    }
    let pickle = model_dir.join("pytorch_model.bin");
    debug!(path = %pickle.display(), "reading pickled weights");
    let weights = candle_core::pickle::read_all(&pickle)
        .map_err(|e| EmbedError::ModelLoad(format!("Failed to load weights from {}: {}", pickle.display(), e)))?;
    let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
    Ok(VarBuilder::from_tensors(weights_map, DType::F32, device))
}

impl Embedder for BertEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn max_len(&self) -> usize { self.max_len }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let started = Instant::now();
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            out.extend(self.embed_chunk(chunk)?);
        }
        let elapsed = started.elapsed();
        if elapsed.as_millis() > 100 * texts.len().max(1) as u128 {
            warn!(texts = texts.len(), elapsed_ms = elapsed.as_millis() as u64, "slow embedding");
        }
        Ok(out)
    }
}
