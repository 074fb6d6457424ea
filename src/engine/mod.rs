//! Engine module tying a provider to its loaded model for the two run modes

mod builder;
mod engine;

pub use builder::EngineBuilder;
pub use engine::{ChatEngine, EngineInfo};

use crate::{
    config::InferenceConfig,
    error::Result,
    provider::{Generate, GenerateRequest},
    types::History,
};

/// Answers chat turns for the web demo
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Evaluate one turn; `history` holds the session's earlier exchanges
    async fn evaluate(
        &self,
        instruction: String,
        input: String,
        history: History,
    ) -> Result<String>;
}

/// The CLI path: forward the configured request to the provider's `generate`.
pub fn run_batch<G: Generate + ?Sized>(provider: &G, config: &InferenceConfig) -> Result<()> {
    let request = GenerateRequest::from_config(config);
    tracing::debug!(?request, "running batch generate");
    provider.generate(&request)
}
