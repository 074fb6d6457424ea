use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    config::InferenceConfig,
    dispatch::build_provider,
    error::{InferenceError, Result},
    provider::ModelHandle,
};

use super::engine::ChatEngine;

/// Builder for constructing a ChatEngine instance
pub struct EngineBuilder {
    config: Option<InferenceConfig>,
    model: Option<ModelHandle>,
}

impl EngineBuilder {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            config: None,
            model: None,
        }
    }

    /// Set the configuration
    pub fn with_config(mut self, config: InferenceConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use an already loaded model instead of loading one from the model path
    pub fn with_model(mut self, model: ModelHandle) -> Self {
        self.model = Some(model);
        self
    }

    /// Build the engine instance
    pub async fn build(self) -> Result<ChatEngine> {
        // Get configuration or use default
        let config = self.config.unwrap_or_default();

        // Validate configuration
        config.validate()?;

        let provider = Arc::new(build_provider(&config)?);

        let model = match self.model {
            Some(model) => model,
            None => {
                let provider = provider.clone();
                tokio::task::spawn_blocking(move || provider.load_model())
                    .await
                    .map_err(|e| InferenceError::Model(format!("model loading task failed: {e}")))??
            }
        };

        Ok(ChatEngine {
            provider,
            model: Arc::new(Mutex::new(model)),
        })
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
