//! Command-line flags

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{CommandFactory, Parser};

use crate::config::{
    default_labels, parse_labels, DbSelector, GenerationConfig, InferenceConfig, ModelConfig,
    TaskType,
};
use crate::dispatch::resolve_names;
use crate::error::Result;

/// Sentinel accepted by `--adapter_weights` for "no adapter".
const NO_ADAPTER: &str = "None";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tryllm",
    author,
    version,
    about = "Try LLM inference from the command line or a web demo",
    allow_negative_numbers = true
)]
pub struct Args {
    /// Debug Mode to output detail info
    #[arg(long)]
    pub debug: bool,

    /// Web Demo to try the inference
    #[arg(long)]
    pub web: bool,

    #[arg(long, default_value = "Hello")]
    pub instruction: String,

    #[arg(long)]
    pub input: Option<String>,

    /// The DIR of test data
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// llama/llama2/chatglm/chatglm2/bloom/qwen/baichuan/mixtral/phi
    #[arg(long = "model_type", default_value = "llama")]
    pub model_type: String,

    /// seq2seq/classify
    #[arg(long = "task_type", default_value = "seq2seq")]
    pub task_type: String,

    /// Labels to classify, only used when task_type is classify
    #[arg(long, default_value = r#"["0", "1"]"#)]
    pub labels: String,

    #[arg(long = "model_path", default_value = "LLMs/open-llama/openllama-3b")]
    pub model_path: PathBuf,

    /// The DIR of adapter weights
    #[arg(long = "adapter_weights", default_value = NO_ADAPTER)]
    pub adapter_weights: String,

    #[arg(long = "load_8bit")]
    pub load_8bit: bool,

    /// Temperature higher, LLM is more creative
    #[arg(long, default_value_t = 0.7)]
    pub temperature: f64,

    #[arg(long = "top_p", default_value_t = 0.9)]
    pub top_p: f64,

    #[arg(long = "top_k", default_value_t = 40)]
    pub top_k: usize,

    #[arg(long = "max_new_tokens", default_value_t = 512)]
    pub max_new_tokens: usize,

    #[arg(long)]
    pub fromdb: bool,

    /// The record is whether 'train' or 'test'
    #[arg(long = "db_type")]
    pub db_type: Option<String>,

    /// The record's set name
    #[arg(long = "db_iteration")]
    pub db_iteration: Option<String>,

    /// The record's test set name
    #[arg(long = "db_test_iteration")]
    pub db_test_iteration: Option<String>,
}

impl Args {
    /// Parse the process arguments, setting aside flags this binary does not know.
    pub fn parse_known() -> (Self, Vec<OsString>) {
        match Self::try_parse_known_from(std::env::args_os()) {
            Ok(parsed) => parsed,
            Err(e) => e.exit(),
        }
    }

    /// Like `try_parse_from`, but unknown flags (and a value following them) are
    /// returned instead of rejected.
    pub fn try_parse_known_from<I, T>(
        itr: I,
    ) -> std::result::Result<(Self, Vec<OsString>), clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let (known, unknown) = split_known(itr.into_iter().map(Into::into).collect());
        let args = Self::try_parse_from(known)?;
        Ok((args, unknown))
    }

    /// Build the immutable run configuration. The `(task_type, model_type)` pair
    /// is checked before anything else so its diagnostic wins.
    pub fn into_config(self) -> Result<InferenceConfig> {
        let (task_type, model_type, _) = resolve_names(&self.task_type, &self.model_type)?;

        let labels = match task_type {
            TaskType::Classify => parse_labels(&self.labels)?,
            TaskType::Seq2Seq => default_labels(),
        };

        let adapter_weights = match self.adapter_weights.as_str() {
            NO_ADAPTER | "" => None,
            path => Some(PathBuf::from(path)),
        };

        Ok(InferenceConfig {
            debug: self.debug,
            web: self.web,
            instruction: self.instruction,
            input: self.input,
            data: self.data,
            model_type,
            task_type,
            labels,
            model: ModelConfig {
                model_path: self.model_path,
                adapter_weights,
                load_8bit: self.load_8bit,
            },
            generation: GenerationConfig {
                temperature: self.temperature,
                top_p: self.top_p,
                top_k: self.top_k,
                max_new_tokens: self.max_new_tokens,
            },
            db: DbSelector {
                fromdb: self.fromdb,
                db_type: self.db_type,
                db_iteration: self.db_iteration,
                db_test_iteration: self.db_test_iteration,
            },
        })
    }
}

/// Split argv into tokens clap understands and the rest.
fn split_known(argv: Vec<OsString>) -> (Vec<OsString>, Vec<OsString>) {
    let mut command = Args::command();
    command.build();
    let takes_value = |arg: &clap::Arg| arg.get_action().takes_values();

    let mut tokens = argv.into_iter();
    let mut known: Vec<OsString> = tokens.next().into_iter().collect();
    let mut unknown = Vec::new();
    let mut pending_value = false;

    let mut tokens = tokens.peekable();
    while let Some(token) = tokens.next() {
        if pending_value {
            known.push(token);
            pending_value = false;
            continue;
        }

        let (flag, is_flag) = {
            let text = token.to_string_lossy();
            let flag = if let Some(long) = text.strip_prefix("--") {
                let (name, inline_value) = match long.split_once('=') {
                    Some((name, _)) => (name, true),
                    None => (long, false),
                };
                command
                    .get_arguments()
                    .find(|arg| arg.get_long() == Some(name))
                    .map(|arg| takes_value(arg) && !inline_value)
            } else if let Some(short) = text.strip_prefix('-').filter(|s| s.chars().count() == 1) {
                command
                    .get_arguments()
                    .find(|arg| arg.get_short().map(String::from).as_deref() == Some(short))
                    .map(takes_value)
            } else {
                None
            };
            (flag, text.starts_with('-'))
        };

        match flag {
            Some(needs_value) => {
                known.push(token);
                pending_value = needs_value;
            }
            None => {
                unknown.push(token);
                let next_is_value = tokens
                    .peek()
                    .is_some_and(|next| !next.to_string_lossy().starts_with('-'));
                if is_flag && next_is_value {
                    unknown.extend(tokens.next());
                }
            }
        }
    }

    (known, unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelFamily;
    use crate::error::{ErrorExt, InferenceError};
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Result<InferenceConfig> {
        let argv = std::iter::once("tryllm").chain(args.iter().copied());
        Args::try_parse_from(argv).unwrap().into_config()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).unwrap();
        assert!(!config.debug);
        assert!(!config.web);
        assert_eq!(config.instruction, "Hello");
        assert_eq!(config.input, None);
        assert_eq!(config.data, None);
        assert_eq!(config.model_type, ModelFamily::Llama);
        assert_eq!(config.task_type, TaskType::Seq2Seq);
        assert_eq!(
            config.model.model_path,
            PathBuf::from("LLMs/open-llama/openllama-3b")
        );
        assert_eq!(config.model.adapter_weights, None);
        assert!(!config.model.load_8bit);
        assert_eq!(config.generation.temperature, 0.7);
        assert_eq!(config.generation.top_p, 0.9);
        assert_eq!(config.generation.top_k, 40);
        assert_eq!(config.generation.max_new_tokens, 512);
        assert!(!config.db.fromdb);
        assert_eq!(config.db.db_type, None);
    }

    #[test]
    fn test_underscore_flags() {
        let config = parse(&[
            "--model_type",
            "qwen",
            "--model_path",
            "LLMs/qwen",
            "--adapter_weights",
            "adapters/qwen-lora",
            "--load_8bit",
            "--top_k",
            "5",
            "--max_new_tokens",
            "64",
            "--fromdb",
            "--db_type",
            "test",
            "--db_iteration",
            "v1",
            "--db_test_iteration",
            "v1-test",
        ])
        .unwrap();
        assert_eq!(config.model_type, ModelFamily::Qwen);
        assert_eq!(
            config.model.adapter_weights,
            Some(PathBuf::from("adapters/qwen-lora"))
        );
        assert!(config.model.load_8bit);
        assert_eq!(config.generation.top_k, 5);
        assert_eq!(config.generation.max_new_tokens, 64);
        assert!(config.db.fromdb);
        assert_eq!(config.db.db_test_iteration.as_deref(), Some("v1-test"));
    }

    #[test]
    fn test_labels_only_parsed_for_classify() {
        // Malformed labels are ignored for seq2seq.
        let config = parse(&["--labels", "not json"]).unwrap();
        assert_eq!(config.labels, vec!["0", "1"]);

        let labels = r#"["pos", "neg", "neutral"]"#;
        let config = parse(&["--task_type", "classify", "--labels", labels]).unwrap();
        assert_eq!(config.labels, vec!["pos", "neg", "neutral"]);

        let err = parse(&["--task_type", "classify", "--labels", "pos,neg"]).unwrap_err();
        assert!(matches!(err, InferenceError::Configuration { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_dispatch_diagnostics() {
        let err = parse(&["--model_type", "gpt2"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "model_type should be llama/llama2/bloom/chatglm/chatglm2/qwen/baichuan/mixtral/phi"
        );

        let err = parse(&[
            "--task_type",
            "classify",
            "--model_type",
            "chatglm2",
            "--labels",
            "oops",
        ])
        .unwrap_err();
        assert_eq!(err.to_string(), "Classify with ChatGLM is not support now.");

        let err = parse(&["--task_type", "summarize"]).unwrap_err();
        assert_eq!(err.to_string(), "task_type should be seq2seq/classify");
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unknown_flags_ignored() {
        let (args, ignored) = Args::try_parse_known_from([
            "tryllm",
            "--beam_size",
            "4",
            "--model_type",
            "phi",
            "--num_beams=2",
            "--verbose",
            "--top_p",
            "0.5",
        ])
        .unwrap();
        assert_eq!(args.model_type, "phi");
        assert_eq!(args.top_p, 0.5);
        assert_eq!(
            ignored,
            vec![
                OsString::from("--beam_size"),
                OsString::from("4"),
                OsString::from("--num_beams=2"),
                OsString::from("--verbose"),
            ]
        );
    }

    #[test]
    fn test_known_values_kept_verbatim() {
        let (args, ignored) = Args::try_parse_known_from([
            "tryllm",
            "--temperature",
            "-0.5",
            "--instruction=--not-a-flag",
            "--debug",
        ])
        .unwrap();
        assert!(ignored.is_empty());
        assert_eq!(args.temperature, -0.5);
        assert_eq!(args.instruction, "--not-a-flag");
        assert!(args.debug);
    }

    #[test]
    fn test_bad_known_value_still_errors() {
        assert!(Args::try_parse_known_from(["tryllm", "--top_k", "many"]).is_err());
    }
}
