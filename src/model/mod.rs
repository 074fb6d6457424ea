//! Model module: candle-backed weights, tokenizer and sampling loop

mod arch;
mod loader;
mod runtime;
mod tokenizer;

pub use loader::{ModelFiles, ModelLoader};
pub use runtime::ModelRuntime;
pub use tokenizer::ModelTokenizer;

use crate::config::GenerationConfig;
use crate::error::Result;

/// Seed for the logits processor
pub(crate) const DEFAULT_SEED: u64 = 299792458;

/// Text operations a loaded model offers to providers.
pub trait TextGenerator: Send {
    /// Continue `prompt`, returning only the newly generated text.
    fn complete(&mut self, prompt: &str, params: &GenerationConfig) -> Result<String>;

    /// Probability of each label as the next token after `prompt`, normalized over the labels.
    fn score_labels(&mut self, prompt: &str, labels: &[String]) -> Result<Vec<f32>>;
}

/// Softmax over a handful of logits.
pub(crate) fn normalize(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|logit| (logit - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
