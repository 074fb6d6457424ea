use std::sync::Mutex;

use clap::Parser;
use pretty_assertions::assert_eq;

use tryllm::{
    build_provider,
    config::GenerationConfig,
    model::TextGenerator,
    provider::ModelHandle,
    run_batch, Args, ChatBackend, EngineBuilder, Generate, GenerateRequest, History,
    ProviderKind, Result,
};

#[derive(Default)]
struct Recording {
    requests: Mutex<Vec<GenerateRequest>>,
}

impl Generate for Recording {
    fn generate(&self, request: &GenerateRequest) -> Result<()> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }
}

#[test]
fn batch_call_reaches_llama_seq2seq() {
    let args = Args::try_parse_from([
        "tryllm",
        "--instruction",
        "Translate: hi",
        "--model_type",
        "llama",
        "--task_type",
        "seq2seq",
    ])
    .unwrap();
    let config = args.into_config().unwrap();

    let provider = build_provider(&config).unwrap();
    assert_eq!(provider.kind(), ProviderKind::LlamaSeq2Seq);
    let settings = provider.settings();
    assert_eq!(settings.temperature, 0.7);
    assert_eq!(settings.top_p, 0.9);
    assert_eq!(settings.top_k, 40);
    assert_eq!(settings.max_new_tokens, 512);

    let recording = Recording::default();
    run_batch(&recording, &config).unwrap();

    let requests = recording.requests.into_inner().unwrap();
    assert_eq!(
        requests,
        vec![GenerateRequest {
            instruction: "Translate: hi".to_string(),
            input: None,
            data_dir: None,
            fromdb: false,
            db_type: None,
            db_iteration: None,
            db_test_iteration: None,
        }]
    );
}

#[test]
fn classify_pair_reaches_bloom_classify() {
    let args = Args::try_parse_from([
        "tryllm",
        "--model_type",
        "bloom",
        "--task_type",
        "classify",
        "--labels",
        r#"["positive", "negative"]"#,
    ])
    .unwrap();
    let config = args.into_config().unwrap();
    assert_eq!(config.labels, vec!["positive", "negative"]);

    let provider = build_provider(&config).unwrap();
    assert_eq!(provider.kind(), ProviderKind::BloomClassify);
    assert_eq!(provider.kind().to_string(), "BLoomClassify");
}

/// Answers with the number of earlier exchanges in the prompt.
struct CountingGenerator;

impl TextGenerator for CountingGenerator {
    fn complete(&mut self, prompt: &str, _params: &GenerationConfig) -> Result<String> {
        let turns = prompt.matches("### Response:").count();
        Ok(format!("turn {turns}"))
    }

    fn score_labels(&mut self, _prompt: &str, labels: &[String]) -> Result<Vec<f32>> {
        Ok(vec![0.0; labels.len()])
    }
}

#[test]
fn chat_engine_sees_history() {
    let config = Args::try_parse_from(["tryllm", "--web", "--model_type", "phi"])
        .unwrap()
        .into_config()
        .unwrap();

    tokio_test::block_on(async {
        let engine = EngineBuilder::new()
            .with_config(config)
            .with_model(ModelHandle::new(CountingGenerator))
            .build()
            .await
            .unwrap();
        assert_eq!(engine.info().provider, ProviderKind::PhiSeq2Seq);

        let mut history = History::new();
        let first = engine
            .evaluate(String::new(), "hello".to_string(), history.clone())
            .await
            .unwrap();
        assert_eq!(first, "turn 1");

        history.push("hello", first);
        let second = engine
            .evaluate(String::new(), "and again".to_string(), history)
            .await
            .unwrap();
        assert_eq!(second, "turn 2");
    });
}
