// Location: src/model/runtime.rs

use std::time::Instant;

use candle_core::{Device, Tensor};
use candle_transformers::generation::{LogitsProcessor, Sampling};
use tracing::debug;

use super::arch::{last_position_logits, CausalLm};
use super::tokenizer::ModelTokenizer;
use super::{normalize, TextGenerator, DEFAULT_SEED};
use crate::config::GenerationConfig;
use crate::error::{InferenceError, Result};

pub struct ModelRuntime {
    model: Box<dyn CausalLm>,
    tokenizer: ModelTokenizer,
    device: Device,
    state: RuntimeState,
}

#[derive(Debug, Default)]
struct RuntimeState {
    total_processed: usize,
    total_tokens_generated: usize,
}

impl ModelRuntime {
    pub(crate) fn new(model: Box<dyn CausalLm>, tokenizer: ModelTokenizer, device: Device) -> Self {
        Self {
            model,
            tokenizer,
            device,
            state: RuntimeState::default(),
        }
    }

    fn encode_prompt(&self, prompt: &str) -> Result<Vec<u32>> {
        let tokens = self.tokenizer.encode(prompt, true)?;
        if tokens.is_empty() {
            return Err(InferenceError::Tokenizer("prompt encodes to no tokens".to_string()));
        }
        Ok(tokens)
    }
}

pub(crate) fn sampling(params: &GenerationConfig) -> Sampling {
    if params.temperature <= 0.0 {
        Sampling::ArgMax
    } else {
        Sampling::TopKThenTopP {
            k: params.top_k,
            p: params.top_p,
            temperature: params.temperature,
        }
    }
}

impl TextGenerator for ModelRuntime {
    fn complete(&mut self, prompt: &str, params: &GenerationConfig) -> Result<String> {
        let start_time = Instant::now();
        self.model.reset()?;

        let mut tokens = self.encode_prompt(prompt)?;
        let prompt_len = tokens.len();
        let eos_token = self.tokenizer.eos_token_id();
        let mut logits_processor = LogitsProcessor::from_sampling(DEFAULT_SEED, sampling(params));

        for index in 0..params.max_new_tokens {
            let context_size = if index > 0 { 1 } else { tokens.len() };
            let start_pos = tokens.len().saturating_sub(context_size);
            let input = Tensor::new(&tokens[start_pos..], &self.device)?.unsqueeze(0)?;
            let logits = last_position_logits(self.model.forward(&input, start_pos)?)?;

            let next_token = logits_processor.sample(&logits)?;
            if Some(next_token) == eos_token {
                break;
            }
            tokens.push(next_token);
        }

        let generated = &tokens[prompt_len..];
        let text = self.tokenizer.decode(generated)?;

        self.state.total_processed += 1;
        self.state.total_tokens_generated += generated.len();
        let elapsed = start_time.elapsed();
        debug!(
            prompt_tokens = prompt_len,
            generated_tokens = generated.len(),
            tokens_per_second = generated.len() as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
            total_processed = self.state.total_processed,
            total_tokens_generated = self.state.total_tokens_generated,
            "generation complete"
        );
        Ok(text)
    }

    fn score_labels(&mut self, prompt: &str, labels: &[String]) -> Result<Vec<f32>> {
        self.model.reset()?;

        let tokens = self.encode_prompt(prompt)?;
        let input = Tensor::new(tokens.as_slice(), &self.device)?.unsqueeze(0)?;
        let logits = last_position_logits(self.model.forward(&input, 0)?)?;

        let mut label_logits = Vec::with_capacity(labels.len());
        for label in labels {
            let token = self.tokenizer.label_token_id(label)?;
            label_logits.push(logits.get(token as usize)?.to_scalar::<f32>()?);
        }

        self.state.total_processed += 1;
        debug!(?labels, ?label_logits, "labels scored");
        Ok(normalize(&label_logits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_modes() {
        let mut params = GenerationConfig::default();
        assert!(matches!(
            sampling(&params),
            Sampling::TopKThenTopP { k: 40, .. }
        ));

        params.temperature = 0.0;
        assert!(matches!(sampling(&params), Sampling::ArgMax));
    }
}
