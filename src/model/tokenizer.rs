// Location: src/model/tokenizer.rs

use std::path::Path;

use tokenizers::Tokenizer;

use crate::config::ModelFamily;
use crate::error::{InferenceError, Result};

pub struct ModelTokenizer {
    /// HuggingFace tokenizer
    tokenizer: Tokenizer,
    /// First end-of-sequence token of the family present in the vocabulary
    eos_token_id: Option<u32>,
}

impl ModelTokenizer {
    pub fn from_file(path: impl AsRef<Path>, family: ModelFamily) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path.as_ref())
            .map_err(|e| InferenceError::Tokenizer(format!("Failed to load tokenizer: {e}")))?;
        Ok(Self::new(tokenizer, family))
    }

    pub fn new(tokenizer: Tokenizer, family: ModelFamily) -> Self {
        let eos_token_id = family
            .eos_tokens()
            .iter()
            .find_map(|token| tokenizer.token_to_id(token));
        if eos_token_id.is_none() {
            tracing::warn!(%family, "no end-of-sequence token in vocabulary");
        }

        Self {
            tokenizer,
            eos_token_id,
        }
    }

    pub fn eos_token_id(&self) -> Option<u32> {
        self.eos_token_id
    }

    pub fn encode(&self, text: &str, add_special_tokens: bool) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, add_special_tokens)
            .map_err(|e| InferenceError::Tokenizer(format!("Tokenization failed: {e}")))?;
        Ok(encoding.get_ids().to_vec())
    }

    pub fn decode(&self, tokens: &[u32]) -> Result<String> {
        self.tokenizer
            .decode(tokens, true)
            .map_err(|e| InferenceError::Tokenizer(format!("Decoding failed: {e}")))
    }

    /// Token that starts `label`, skipping pieces that decode to whitespace
    /// (sentencepiece vocabularies emit a bare word-boundary piece before digits).
    pub fn label_token_id(&self, label: &str) -> Result<u32> {
        for id in self.encode(label, false)? {
            if !self.decode(&[id])?.trim().is_empty() {
                return Ok(id);
            }
        }
        Err(InferenceError::Tokenizer(format!(
            "label {label:?} encodes to no usable token"
        )))
    }
}
