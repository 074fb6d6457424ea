//! Test data read from the `--data` directory.
//!
//! Every `*.json` file holds an array of records and every `*.jsonl` file one
//! record per line. Files are read in name order.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{InferenceError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub instruction: String,

    #[serde(default)]
    pub input: Option<String>,

    /// Expected answer; the gold label for classification data
    #[serde(default)]
    pub output: Option<String>,
}

/// A record with the provider's answer, printed as one JSON line.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction<'a> {
    pub instruction: &'a str,
    pub input: Option<&'a str>,
    pub output: Option<&'a str>,
    pub prediction: &'a str,
}

pub fn load_dir(dir: &Path) -> Result<Vec<Record>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file() && data_format(path).is_some())
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(InferenceError::Dataset {
            path: dir.to_path_buf(),
            message: "no .json or .jsonl files found".to_string(),
        });
    }

    let mut records = Vec::new();
    for path in files {
        let loaded = load_file(&path)?;
        tracing::debug!(path = %path.display(), records = loaded.len(), "loaded test data");
        records.extend(loaded);
    }
    Ok(records)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataFormat {
    Json,
    JsonLines,
}

fn data_format(path: &Path) -> Option<DataFormat> {
    match path.extension()?.to_str()? {
        "json" => Some(DataFormat::Json),
        "jsonl" => Some(DataFormat::JsonLines),
        _ => None,
    }
}

fn load_file(path: &Path) -> Result<Vec<Record>> {
    let content = fs::read_to_string(path)?;
    let dataset_error = |message: String| InferenceError::Dataset {
        path: path.to_path_buf(),
        message,
    };

    match data_format(path) {
        Some(DataFormat::Json) => {
            serde_json::from_str(&content).map_err(|e| dataset_error(e.to_string()))
        }
        Some(DataFormat::JsonLines) => content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str(line)
                    .map_err(|e| dataset_error(format!("line {}: {}", idx + 1, e)))
            })
            .collect(),
        None => Ok(Vec::new()),
    }
}
