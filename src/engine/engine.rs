use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use super::ChatBackend;
use crate::{
    config::ModelFamily,
    dispatch::ProviderKind,
    error::{InferenceError, Result},
    provider::{ModelHandle, Provider},
    types::History,
};

/// A provider with its model loaded, shared by every chat session
pub struct ChatEngine {
    pub(super) provider: Arc<Provider>,
    pub(super) model: Arc<Mutex<ModelHandle>>,
}

impl ChatEngine {
    /// Create a new engine builder
    pub fn builder() -> super::EngineBuilder {
        super::EngineBuilder::new()
    }

    /// Get information about the loaded provider
    pub fn info(&self) -> EngineInfo {
        EngineInfo {
            provider: self.provider.kind(),
            model_type: self.provider.family(),
            model_path: self.provider.settings().base_model.clone(),
        }
    }
}

#[async_trait::async_trait]
impl ChatBackend for ChatEngine {
    async fn evaluate(
        &self,
        instruction: String,
        input: String,
        history: History,
    ) -> Result<String> {
        let provider = self.provider.clone();
        let model = self.model.clone();

        // Generation is blocking; requests from all sessions queue on the model lock.
        tokio::task::spawn_blocking(move || {
            let mut model = model.lock();
            provider
                .evaluate(&mut model, &instruction, &input, &history)
                .map(|response| response.into_text())
        })
        .await
        .map_err(|e| InferenceError::Model(format!("generation task failed: {e}")))?
    }
}

/// Information about the engine's provider
#[derive(Debug, Clone)]
pub struct EngineInfo {
    pub provider: ProviderKind,
    pub model_type: ModelFamily,
    pub model_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GenerationConfig, InferenceConfig};
    use crate::model::TextGenerator;

    struct Shout;

    impl TextGenerator for Shout {
        fn complete(&mut self, prompt: &str, _params: &GenerationConfig) -> Result<String> {
            let question = prompt
                .rsplit("### Instruction:\n")
                .next()
                .and_then(|tail| tail.split('\n').next())
                .unwrap_or_default();
            Ok(question.to_uppercase())
        }

        fn score_labels(&mut self, _prompt: &str, labels: &[String]) -> Result<Vec<f32>> {
            Ok(vec![1.0 / labels.len() as f32; labels.len()])
        }
    }

    #[tokio::test]
    async fn test_engine_evaluate() {
        let engine = ChatEngine::builder()
            .with_config(InferenceConfig::default())
            .with_model(ModelHandle::new(Shout))
            .build()
            .await
            .unwrap();

        let info = engine.info();
        assert_eq!(info.provider, ProviderKind::LlamaSeq2Seq);
        assert_eq!(info.model_type, ModelFamily::Llama);

        let answer = engine
            .evaluate(String::new(), "ping".to_string(), History::new())
            .await
            .unwrap();
        assert_eq!(answer, "PING");
    }
}
