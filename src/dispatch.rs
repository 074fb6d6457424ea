//! Maps a `(task_type, model_type)` pair to the provider that serves it.

use std::fmt;

use crate::config::{InferenceConfig, ModelFamily, TaskType};
use crate::provider::{Classify, Provider, ProviderSettings, Seq2Seq};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("model_type should be llama/llama2/bloom/chatglm/chatglm2/qwen/baichuan/mixtral/phi")]
    UnknownModelType(String),

    #[error("task_type should be seq2seq/classify")]
    UnknownTaskType(String),

    #[error("Classify with {} is not support now.", .0.display_name())]
    UnsupportedClassify(ModelFamily),
}

/// Concrete provider types, one per family wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    LlamaSeq2Seq,
    ChatGlmSeq2Seq,
    BloomSeq2Seq,
    QwenSeq2Seq,
    BaichuanSeq2Seq,
    MixtralSeq2Seq,
    PhiSeq2Seq,
    LlamaClassify,
    BloomClassify,
}

type Factory = fn(ProviderKind, ModelFamily, ProviderSettings, &[String]) -> Provider;

struct Entry {
    task: TaskType,
    family: ModelFamily,
    kind: Option<ProviderKind>,
}

const fn supported(task: TaskType, family: ModelFamily, kind: ProviderKind) -> Entry {
    Entry {
        task,
        family,
        kind: Some(kind),
    }
}

const fn unsupported(task: TaskType, family: ModelFamily) -> Entry {
    Entry {
        task,
        family,
        kind: None,
    }
}

static COMPATIBILITY: [Entry; 18] = [
    supported(TaskType::Seq2Seq, ModelFamily::Llama, ProviderKind::LlamaSeq2Seq),
    supported(TaskType::Seq2Seq, ModelFamily::Llama2, ProviderKind::LlamaSeq2Seq),
    supported(TaskType::Seq2Seq, ModelFamily::ChatGlm, ProviderKind::ChatGlmSeq2Seq),
    supported(TaskType::Seq2Seq, ModelFamily::ChatGlm2, ProviderKind::ChatGlmSeq2Seq),
    supported(TaskType::Seq2Seq, ModelFamily::Bloom, ProviderKind::BloomSeq2Seq),
    supported(TaskType::Seq2Seq, ModelFamily::Qwen, ProviderKind::QwenSeq2Seq),
    supported(TaskType::Seq2Seq, ModelFamily::Baichuan, ProviderKind::BaichuanSeq2Seq),
    supported(TaskType::Seq2Seq, ModelFamily::Mixtral, ProviderKind::MixtralSeq2Seq),
    supported(TaskType::Seq2Seq, ModelFamily::Phi, ProviderKind::PhiSeq2Seq),
    supported(TaskType::Classify, ModelFamily::Llama, ProviderKind::LlamaClassify),
    supported(TaskType::Classify, ModelFamily::Llama2, ProviderKind::LlamaClassify),
    unsupported(TaskType::Classify, ModelFamily::ChatGlm),
    unsupported(TaskType::Classify, ModelFamily::ChatGlm2),
    supported(TaskType::Classify, ModelFamily::Bloom, ProviderKind::BloomClassify),
    unsupported(TaskType::Classify, ModelFamily::Qwen),
    unsupported(TaskType::Classify, ModelFamily::Baichuan),
    unsupported(TaskType::Classify, ModelFamily::Mixtral),
    unsupported(TaskType::Classify, ModelFamily::Phi),
];

impl ProviderKind {
    pub fn task_type(&self) -> TaskType {
        match self {
            ProviderKind::LlamaClassify | ProviderKind::BloomClassify => TaskType::Classify,
            _ => TaskType::Seq2Seq,
        }
    }

    fn factory(&self) -> Factory {
        match self.task_type() {
            TaskType::Seq2Seq => build_seq2seq,
            TaskType::Classify => build_classify,
        }
    }

    /// Construct the provider for `family`. Labels are ignored by seq2seq providers.
    pub fn build(
        self,
        family: ModelFamily,
        settings: ProviderSettings,
        labels: &[String],
    ) -> Provider {
        (self.factory())(self, family, settings, labels)
    }
}

fn build_seq2seq(
    kind: ProviderKind,
    family: ModelFamily,
    settings: ProviderSettings,
    _labels: &[String],
) -> Provider {
    Provider::Seq2Seq(Seq2Seq::new(kind, family, settings))
}

fn build_classify(
    kind: ProviderKind,
    family: ModelFamily,
    settings: ProviderSettings,
    labels: &[String],
) -> Provider {
    Provider::Classify(Classify::new(kind, family, settings, labels.to_vec()))
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::LlamaSeq2Seq => "LLAMASeq2Seq",
            ProviderKind::ChatGlmSeq2Seq => "ChatGLMSeq2Seq",
            ProviderKind::BloomSeq2Seq => "BLoomSeq2Seq",
            ProviderKind::QwenSeq2Seq => "QwenSeq2Seq",
            ProviderKind::BaichuanSeq2Seq => "BaichuanSeq2Seq",
            ProviderKind::MixtralSeq2Seq => "MixtralSeq2Seq",
            ProviderKind::PhiSeq2Seq => "PhiSeq2Seq",
            ProviderKind::LlamaClassify => "LLAMAClassify",
            ProviderKind::BloomClassify => "BLoomClassify",
        };
        f.write_str(name)
    }
}

/// Look up the provider kind for a validated pair.
pub fn resolve(task: TaskType, family: ModelFamily) -> Result<ProviderKind, DispatchError> {
    COMPATIBILITY
        .iter()
        .find(|entry| entry.task == task && entry.family == family)
        .and_then(|entry| entry.kind)
        .ok_or(DispatchError::UnsupportedClassify(family))
}

/// Look up the provider kind for raw `--task_type` / `--model_type` strings.
pub fn resolve_names(
    task: &str,
    model: &str,
) -> Result<(TaskType, ModelFamily, ProviderKind), DispatchError> {
    let task: TaskType = task.parse()?;
    let family: ModelFamily = model.parse()?;
    let kind = resolve(task, family)?;
    Ok((task, family, kind))
}

/// Build the single provider for this run.
pub fn build_provider(config: &InferenceConfig) -> Result<Provider, DispatchError> {
    let kind = resolve(config.task_type, config.model_type)?;
    let settings = ProviderSettings::from_config(config);
    tracing::debug!(%kind, model_type = %config.model_type, "constructing provider");
    Ok(kind.build(config.model_type, settings, &config.labels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq2seq_supports_every_family() {
        for family in ModelFamily::ALL {
            let kind = resolve(TaskType::Seq2Seq, family).unwrap();
            assert_eq!(kind.task_type(), TaskType::Seq2Seq);
        }
        assert_eq!(
            resolve(TaskType::Seq2Seq, ModelFamily::ChatGlm2),
            Ok(ProviderKind::ChatGlmSeq2Seq)
        );
        assert_eq!(
            resolve(TaskType::Seq2Seq, ModelFamily::Llama2),
            Ok(ProviderKind::LlamaSeq2Seq)
        );
    }

    #[test]
    fn test_classify_table() {
        assert_eq!(
            resolve(TaskType::Classify, ModelFamily::Llama),
            Ok(ProviderKind::LlamaClassify)
        );
        assert_eq!(
            resolve(TaskType::Classify, ModelFamily::Llama2),
            Ok(ProviderKind::LlamaClassify)
        );
        assert_eq!(
            resolve(TaskType::Classify, ModelFamily::Bloom),
            Ok(ProviderKind::BloomClassify)
        );

        for family in [
            ModelFamily::ChatGlm,
            ModelFamily::ChatGlm2,
            ModelFamily::Qwen,
            ModelFamily::Baichuan,
            ModelFamily::Mixtral,
            ModelFamily::Phi,
        ] {
            assert_eq!(
                resolve(TaskType::Classify, family),
                Err(DispatchError::UnsupportedClassify(family))
            );
        }
    }

    #[test]
    fn test_table_covers_every_pair_once() {
        for task in [TaskType::Seq2Seq, TaskType::Classify] {
            for family in ModelFamily::ALL {
                let hits = COMPATIBILITY
                    .iter()
                    .filter(|entry| entry.task == task && entry.family == family)
                    .count();
                assert_eq!(hits, 1, "{task}/{family}");
            }
        }
    }

    #[test]
    fn test_diagnostics() {
        let err = resolve_names("classify", "chatglm2").unwrap_err();
        assert_eq!(err.to_string(), "Classify with ChatGLM is not support now.");

        let err = resolve_names("classify", "mixtral").unwrap_err();
        assert_eq!(err.to_string(), "Classify with Mixtral is not support now.");

        for task in ["seq2seq", "classify"] {
            let err = resolve_names(task, "gpt2").unwrap_err();
            assert_eq!(
                err.to_string(),
                "model_type should be llama/llama2/bloom/chatglm/chatglm2/qwen/baichuan/mixtral/phi"
            );
        }

        let err = resolve_names("summarize", "llama").unwrap_err();
        assert_eq!(err, DispatchError::UnknownTaskType("summarize".to_string()));
    }

    #[test]
    fn test_build_provider_variant() {
        let mut config = InferenceConfig::default();
        config.task_type = TaskType::Classify;
        config.model_type = ModelFamily::Bloom;
        config.labels = vec!["spam".to_string(), "ham".to_string()];

        match build_provider(&config).unwrap() {
            Provider::Classify(classify) => {
                assert_eq!(classify.kind(), ProviderKind::BloomClassify);
                assert_eq!(classify.labels(), ["spam", "ham"]);
            }
            Provider::Seq2Seq(_) => panic!("expected a classify provider"),
        }

        config.task_type = TaskType::Seq2Seq;
        config.model_type = ModelFamily::Phi;
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.kind(), ProviderKind::PhiSeq2Seq);
        assert_eq!(provider.family(), ModelFamily::Phi);

        config.task_type = TaskType::Classify;
        assert!(build_provider(&config).is_err());
    }
}
