//! Model providers: one object per run, bound to a family and a task.

mod dataset;
mod prompt;

use std::io::Write;
use std::path::PathBuf;

use tracing::{info, warn};

pub use dataset::{load_dir, Prediction, Record};
pub use prompt::build_prompt;

use crate::config::{GenerationConfig, InferenceConfig, ModelFamily, TaskType};
use crate::dispatch::ProviderKind;
use crate::error::{InferenceError, Result};
use crate::model::{ModelLoader, TextGenerator};
use crate::types::{Classification, History, Response};

/// Settings copied verbatim from the configuration when the provider is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub debug: bool,
    pub web: bool,
    pub base_model: PathBuf,
    pub adapter_weights: Option<PathBuf>,
    pub load_8bit: bool,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: usize,
    pub max_new_tokens: usize,
}

impl ProviderSettings {
    pub fn from_config(config: &InferenceConfig) -> Self {
        Self {
            debug: config.debug,
            web: config.web,
            base_model: config.model.model_path.clone(),
            adapter_weights: config.model.adapter_weights.clone(),
            load_8bit: config.model.load_8bit,
            temperature: config.generation.temperature,
            top_p: config.generation.top_p,
            top_k: config.generation.top_k,
            max_new_tokens: config.generation.max_new_tokens,
        }
    }

    pub fn generation(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            max_new_tokens: self.max_new_tokens,
        }
    }
}

/// A loaded model, owned by whoever drives generation.
pub struct ModelHandle {
    generator: Box<dyn TextGenerator>,
}

impl ModelHandle {
    pub fn new(generator: impl TextGenerator + 'static) -> Self {
        Self {
            generator: Box::new(generator),
        }
    }

    fn generator(&mut self) -> &mut dyn TextGenerator {
        self.generator.as_mut()
    }
}

/// Arguments of the batch `generate` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateRequest {
    pub instruction: String,
    pub input: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub fromdb: bool,
    pub db_type: Option<String>,
    pub db_iteration: Option<String>,
    pub db_test_iteration: Option<String>,
}

impl GenerateRequest {
    pub fn from_config(config: &InferenceConfig) -> Self {
        Self {
            instruction: config.instruction.clone(),
            input: config.input.clone(),
            data_dir: config.data.clone(),
            fromdb: config.db.fromdb,
            db_type: config.db.db_type.clone(),
            db_iteration: config.db.db_iteration.clone(),
            db_test_iteration: config.db.db_test_iteration.clone(),
        }
    }
}

/// The batch entry point of a provider.
pub trait Generate {
    fn generate(&self, request: &GenerateRequest) -> Result<()>;
}

/// Free-form generation provider.
#[derive(Debug, Clone)]
pub struct Seq2Seq {
    kind: ProviderKind,
    family: ModelFamily,
    settings: ProviderSettings,
}

/// Label-scoring classification provider.
#[derive(Debug, Clone)]
pub struct Classify {
    kind: ProviderKind,
    family: ModelFamily,
    settings: ProviderSettings,
    labels: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum Provider {
    Seq2Seq(Seq2Seq),
    Classify(Classify),
}

impl Seq2Seq {
    pub fn new(kind: ProviderKind, family: ModelFamily, settings: ProviderSettings) -> Self {
        Self {
            kind,
            family,
            settings,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn evaluate(
        &self,
        model: &mut ModelHandle,
        instruction: &str,
        input: &str,
        history: &History,
    ) -> Result<String> {
        let params = self.settings.generation();
        params.check()?;
        let prompt = build_prompt(instruction, input, history);
        let text = model.generator().complete(&prompt, &params)?;
        Ok(text.trim().to_string())
    }
}

impl Classify {
    pub fn new(
        kind: ProviderKind,
        family: ModelFamily,
        settings: ProviderSettings,
        labels: Vec<String>,
    ) -> Self {
        Self {
            kind,
            family,
            settings,
            labels,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn evaluate(
        &self,
        model: &mut ModelHandle,
        instruction: &str,
        input: &str,
        history: &History,
    ) -> Result<Classification> {
        let prompt = build_prompt(instruction, input, history);
        let scores = model.generator().score_labels(&prompt, &self.labels)?;
        Classification::from_scores(&self.labels, &scores)
            .ok_or_else(|| InferenceError::Model("no label could be scored".to_string()))
    }
}

impl Provider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::Seq2Seq(p) => p.kind,
            Provider::Classify(p) => p.kind,
        }
    }

    pub fn family(&self) -> ModelFamily {
        match self {
            Provider::Seq2Seq(p) => p.family,
            Provider::Classify(p) => p.family,
        }
    }

    pub fn task_type(&self) -> TaskType {
        self.kind().task_type()
    }

    pub fn settings(&self) -> &ProviderSettings {
        match self {
            Provider::Seq2Seq(p) => &p.settings,
            Provider::Classify(p) => &p.settings,
        }
    }

    /// Load weights and tokenizer from `base_model`.
    pub fn load_model(&self) -> Result<ModelHandle> {
        let settings = self.settings();
        info!(
            provider = %self.kind(),
            base_model = %settings.base_model.display(),
            debug = settings.debug,
            web = settings.web,
            "loading model"
        );
        let runtime = ModelLoader::new(self.family(), settings)?.load()?;
        Ok(ModelHandle::new(runtime))
    }

    pub fn evaluate(
        &self,
        model: &mut ModelHandle,
        instruction: &str,
        input: &str,
        history: &History,
    ) -> Result<Response> {
        match self {
            Provider::Seq2Seq(p) => p
                .evaluate(model, instruction, input, history)
                .map(Response::text),
            Provider::Classify(p) => p
                .evaluate(model, instruction, input, history)
                .map(Response::Label),
        }
    }

    /// Answer `request` with an already loaded model, writing results to `out`.
    pub fn generate_with<W: Write>(
        &self,
        model: &mut ModelHandle,
        request: &GenerateRequest,
        out: &mut W,
    ) -> Result<()> {
        let Some(dir) = &request.data_dir else {
            let input = request.input.as_deref().unwrap_or_default();
            let response = self.evaluate(model, &request.instruction, input, &History::new())?;
            writeln!(out, "{}", response.as_text())?;
            return Ok(());
        };

        let records = load_dir(dir)?;
        info!(data = %dir.display(), records = records.len(), "running test data");

        let mut labelled = 0usize;
        let mut correct = 0usize;
        for record in &records {
            let input = record.input.as_deref().unwrap_or_default();
            let response = self.evaluate(model, &record.instruction, input, &History::new())?;

            if let (Some(expected), Response::Label(classification)) = (&record.output, &response) {
                labelled += 1;
                if classification.label == *expected {
                    correct += 1;
                }
            }

            let prediction = Prediction {
                instruction: &record.instruction,
                input: record.input.as_deref(),
                output: record.output.as_deref(),
                prediction: response.as_text(),
            };
            writeln!(out, "{}", serde_json::to_string(&prediction)?)?;
        }

        if labelled > 0 {
            let accuracy = correct as f64 / labelled as f64;
            info!(correct, labelled, accuracy, "classification finished");
            writeln!(out, "accuracy: {correct}/{labelled} ({accuracy:.4})")?;
        }
        Ok(())
    }
}

impl Generate for Provider {
    fn generate(&self, request: &GenerateRequest) -> Result<()> {
        if request.fromdb {
            warn!(
                db_type = ?request.db_type,
                db_iteration = ?request.db_iteration,
                db_test_iteration = ?request.db_test_iteration,
                "records requested from the example database"
            );
            return Err(InferenceError::Unsupported(
                "database-backed example retrieval".to_string(),
            ));
        }

        let mut model = self.load_model()?;
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        self.generate_with(&mut model, request, &mut out)?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::build_provider;
    use crate::error::ErrorExt;
    use std::fs;
    use tempfile::tempdir;

    /// Echoes the prompt tail and prefers the label mentioned in the prompt.
    struct EchoGenerator {
        prompts: Vec<String>,
    }

    impl TextGenerator for EchoGenerator {
        fn complete(&mut self, prompt: &str, params: &GenerationConfig) -> Result<String> {
            self.prompts.push(prompt.to_string());
            Ok(format!("  echo ({} tokens)\n", params.max_new_tokens))
        }

        fn score_labels(&mut self, prompt: &str, labels: &[String]) -> Result<Vec<f32>> {
            self.prompts.push(prompt.to_string());
            Ok(labels
                .iter()
                .map(|label| if prompt.contains(label.as_str()) { 0.9 } else { 0.1 })
                .collect())
        }
    }

    fn echo_handle() -> ModelHandle {
        ModelHandle::new(EchoGenerator {
            prompts: Vec::new(),
        })
    }

    fn classify_config() -> InferenceConfig {
        let mut config = InferenceConfig::default();
        config.task_type = TaskType::Classify;
        config.labels = vec!["spam".to_string(), "ham".to_string()];
        config
    }

    #[test]
    fn test_settings_copied_verbatim() {
        let mut config = InferenceConfig::default();
        config.debug = true;
        config.model.load_8bit = true;
        config.model.adapter_weights = Some(PathBuf::from("adapters/lora"));
        config.generation.top_k = 7;

        let provider = build_provider(&config).unwrap();
        let settings = provider.settings();
        assert!(settings.debug);
        assert!(!settings.web);
        assert!(settings.load_8bit);
        assert_eq!(settings.base_model, PathBuf::from("LLMs/open-llama/openllama-3b"));
        assert_eq!(settings.adapter_weights, Some(PathBuf::from("adapters/lora")));
        assert_eq!(settings.top_k, 7);
        assert_eq!(settings.generation().max_new_tokens, 512);
    }

    #[test]
    fn test_seq2seq_single_request() {
        let provider = build_provider(&InferenceConfig::default()).unwrap();
        let mut model = echo_handle();
        let request = GenerateRequest {
            instruction: "Translate: hi".to_string(),
            ..Default::default()
        };

        let mut out = Vec::new();
        provider.generate_with(&mut model, &request, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "echo (512 tokens)\n");
    }

    #[test]
    fn test_classify_evaluate() {
        let provider = build_provider(&classify_config()).unwrap();
        let mut model = echo_handle();

        let response = provider
            .evaluate(&mut model, "Is this ham?", "", &History::new())
            .unwrap();
        match response {
            Response::Label(classification) => {
                assert_eq!(classification.label, "ham");
                assert_eq!(classification.scores.len(), 2);
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn test_classify_data_dir_reports_accuracy() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("test.jsonl"),
            concat!(
                r#"{"instruction": "label this", "input": "cheap spam pills", "output": "spam"}"#,
                "\n",
                r#"{"instruction": "label this", "input": "lunch at noon, ham", "output": "spam"}"#,
                "\n",
            ),
        )
        .unwrap();

        let provider = build_provider(&classify_config()).unwrap();
        let mut model = echo_handle();
        let request = GenerateRequest {
            instruction: "unused".to_string(),
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        let mut out = Vec::new();
        provider.generate_with(&mut model, &request, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 3);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["prediction"], "spam");
        assert_eq!(first["output"], "spam");
        assert_eq!(lines[2], "accuracy: 1/2 (0.5000)");
    }

    #[test]
    fn test_out_of_range_sampling_fails_in_provider() {
        let mut config = InferenceConfig::default();
        config.generation.top_p = 1.5;

        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.settings().top_p, 1.5);

        let mut model = echo_handle();
        let err = provider
            .evaluate(&mut model, "Translate: hi", "", &History::new())
            .unwrap_err();
        assert!(matches!(err, InferenceError::InvalidSetting { .. }));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_fromdb_is_rejected_before_loading() {
        let provider = build_provider(&InferenceConfig::default()).unwrap();
        let request = GenerateRequest {
            instruction: "Hello".to_string(),
            fromdb: true,
            db_type: Some("test".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            provider.generate(&request),
            Err(InferenceError::Unsupported(_))
        ));
    }
}
