use candle_core::{Device, Tensor};
use ragctx_core::error::EmbedError;
use tokenizers::Tokenizer;

use crate::inference_err;

/// Token tensors for one forward pass, all shaped `[batch, seq_len]`.
pub struct TokenBatch {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
}

/// Tokenize `texts`, truncate each to `max_len` and right-pad to the longest
/// sequence in the batch.
pub fn tokenize_batch(
    tokenizer: &Tokenizer,
    texts: &[String],
    max_len: usize,
    pad_id: u32,
    device: &Device,
) -> Result<TokenBatch, EmbedError> {
    let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let encodings = tokenizer
        .encode_batch(inputs, true)
        .map_err(|e| EmbedError::Tokenize(e.to_string()))?;

    let seq_len = encodings.iter().map(|e| e.get_ids().len().min(max_len)).max().unwrap_or(0).max(1);
    let mut ids = Vec::with_capacity(encodings.len() * seq_len);
    let mut mask = Vec::with_capacity(encodings.len() * seq_len);
    for enc in &encodings {
        let n = enc.get_ids().len().min(max_len);
        ids.extend_from_slice(&enc.get_ids()[..n]);
        mask.extend_from_slice(&enc.get_attention_mask()[..n]);
        ids.extend(std::iter::repeat(pad_id).take(seq_len - n));
        mask.extend(std::iter::repeat(0u32).take(seq_len - n));
    }

    let shape = (encodings.len(), seq_len);
    let input_ids = Tensor::from_vec(ids, shape, device).map_err(inference_err)?;
    let attention_mask = Tensor::from_vec(mask, shape, device).map_err(inference_err)?;
    let token_type_ids = input_ids.zeros_like().map_err(inference_err)?;
    Ok(TokenBatch { input_ids, token_type_ids, attention_mask })
}
