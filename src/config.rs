// Location: src/config.rs

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dispatch::DispatchError;
use crate::error::{InferenceError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Output detailed information while running
    pub debug: bool,

    /// Serve the chat demo instead of the batch call
    pub web: bool,

    /// Instruction for the batch call
    pub instruction: String,

    /// Optional input accompanying the instruction
    pub input: Option<String>,

    /// Directory of test data
    pub data: Option<PathBuf>,

    pub model_type: ModelFamily,

    pub task_type: TaskType,

    /// Labels to classify, only used when task_type is classify
    pub labels: Vec<String>,

    pub model: ModelConfig,

    pub generation: GenerationConfig,

    pub db: DbSelector,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Directory holding config.json, tokenizer.json and safetensors shards
    pub model_path: PathBuf,

    /// Directory of adapter weights
    pub adapter_weights: Option<PathBuf>,

    /// Request 8-bit weights
    pub load_8bit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Temperature for sampling; higher is more creative, zero or below is greedy
    pub temperature: f64,

    /// Top-p sampling threshold
    pub top_p: f64,

    /// Top-k sampling
    pub top_k: usize,

    /// Maximum number of tokens to generate
    pub max_new_tokens: usize,
}

/// Selects records from the example database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbSelector {
    pub fromdb: bool,

    /// Whether the record is "train" or "test"
    pub db_type: Option<String>,

    /// The record's set name
    pub db_iteration: Option<String>,

    /// The record's test set name
    pub db_test_iteration: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    Llama,
    Llama2,
    ChatGlm,
    ChatGlm2,
    Bloom,
    Qwen,
    Baichuan,
    Mixtral,
    Phi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Seq2Seq,
    Classify,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 9] = [
        ModelFamily::Llama,
        ModelFamily::Llama2,
        ModelFamily::ChatGlm,
        ModelFamily::ChatGlm2,
        ModelFamily::Bloom,
        ModelFamily::Qwen,
        ModelFamily::Baichuan,
        ModelFamily::Mixtral,
        ModelFamily::Phi,
    ];

    /// The `--model_type` spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::Llama => "llama",
            ModelFamily::Llama2 => "llama2",
            ModelFamily::ChatGlm => "chatglm",
            ModelFamily::ChatGlm2 => "chatglm2",
            ModelFamily::Bloom => "bloom",
            ModelFamily::Qwen => "qwen",
            ModelFamily::Baichuan => "baichuan",
            ModelFamily::Mixtral => "mixtral",
            ModelFamily::Phi => "phi",
        }
    }

    /// Human readable family name used in diagnostics
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelFamily::Llama | ModelFamily::Llama2 => "LLaMA",
            ModelFamily::ChatGlm | ModelFamily::ChatGlm2 => "ChatGLM",
            ModelFamily::Bloom => "BLOOM",
            ModelFamily::Qwen => "Qwen",
            ModelFamily::Baichuan => "Baichuan",
            ModelFamily::Mixtral => "Mixtral",
            ModelFamily::Phi => "Phi",
        }
    }

    /// End-of-sequence tokens tried in order against the tokenizer vocabulary
    pub fn eos_tokens(&self) -> &'static [&'static str] {
        match self {
            ModelFamily::Llama
            | ModelFamily::Llama2
            | ModelFamily::Mixtral
            | ModelFamily::Baichuan
            | ModelFamily::ChatGlm
            | ModelFamily::ChatGlm2 => &["</s>", "<eos>"],
            ModelFamily::Bloom => &["</s>"],
            ModelFamily::Qwen => &["<|endoftext|>", "<|im_end|>"],
            ModelFamily::Phi => &["<|endoftext|>"],
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFamily {
    type Err = DispatchError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ModelFamily::ALL
            .into_iter()
            .find(|family| family.as_str() == s)
            .ok_or_else(|| DispatchError::UnknownModelType(s.to_string()))
    }
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Seq2Seq => "seq2seq",
            TaskType::Classify => "classify",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = DispatchError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "seq2seq" => Ok(TaskType::Seq2Seq),
            "classify" => Ok(TaskType::Classify),
            other => Err(DispatchError::UnknownTaskType(other.to_string())),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            max_new_tokens: 512,
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            debug: false,
            web: false,
            instruction: "Hello".to_string(),
            input: None,
            data: None,
            model_type: ModelFamily::Llama,
            task_type: TaskType::Seq2Seq,
            labels: default_labels(),
            model: ModelConfig {
                model_path: PathBuf::from("LLMs/open-llama/openllama-3b"),
                adapter_weights: None,
                load_8bit: false,
            },
            generation: GenerationConfig::default(),
            db: DbSelector::default(),
        }
    }
}

pub(crate) fn default_labels() -> Vec<String> {
    vec!["0".to_string(), "1".to_string()]
}

/// Parse the `--labels` JSON list.
pub fn parse_labels(raw: &str) -> Result<Vec<String>> {
    serde_json::from_str::<Vec<String>>(raw).map_err(|e| {
        InferenceError::configuration("labels", format!("expected a JSON list of strings: {e}"))
    })
}

impl InferenceConfig {
    /// Checks that hold before any provider exists. Generation parameters are
    /// copied onto the provider as given and checked when sampling starts.
    pub fn validate(&self) -> Result<()> {
        if self.task_type == TaskType::Classify && self.labels.is_empty() {
            return Err(InferenceError::configuration(
                "labels",
                "Classification needs at least one label",
            ));
        }

        Ok(())
    }
}

impl GenerationConfig {
    /// Bounds the sampling loop needs.
    pub fn check(&self) -> Result<()> {
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(InferenceError::InvalidSetting {
                parameter: "top_p".to_string(),
                message: "Top-p must be in (0, 1]".to_string(),
            });
        }

        if self.max_new_tokens == 0 {
            return Err(InferenceError::InvalidSetting {
                parameter: "max_new_tokens".to_string(),
                message: "At least one new token must be allowed".to_string(),
            });
        }

        Ok(())
    }
}
