use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use serde::Deserialize;
use tracing::{info, warn};

use super::arch;
use super::runtime::ModelRuntime;
use super::tokenizer::ModelTokenizer;
use crate::config::ModelFamily;
use crate::error::{InferenceError, Result};
use crate::provider::ProviderSettings;

const SAFETENSORS_INDEX: &str = "model.safetensors.index.json";

/// Files making up a model directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: Vec<PathBuf>,
}

#[derive(Deserialize)]
struct SafetensorsIndex {
    weight_map: std::collections::HashMap<String, String>,
}

impl ModelFiles {
    /// Locate `config.json`, `tokenizer.json` and the safetensors shards in `dir`.
    pub fn discover(dir: &Path) -> Result<Self> {
        let missing = |what: &str| {
            InferenceError::Model(format!("{} not found in {}", what, dir.display()))
        };

        let config = dir.join("config.json");
        if !config.is_file() {
            return Err(missing("config.json"));
        }
        let tokenizer = dir.join("tokenizer.json");
        if !tokenizer.is_file() {
            return Err(missing("tokenizer.json"));
        }

        let index = dir.join(SAFETENSORS_INDEX);
        let weights: Vec<PathBuf> = if index.is_file() {
            let index: SafetensorsIndex = serde_json::from_slice(&fs::read(&index)?)?;
            index
                .weight_map
                .into_values()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(|file| dir.join(file))
                .collect()
        } else {
            let mut shards: Vec<PathBuf> = fs::read_dir(dir)?
                .filter_map(|entry| entry.ok().map(|entry| entry.path()))
                .filter(|path| path.extension().is_some_and(|ext| ext == "safetensors"))
                .collect();
            shards.sort();
            shards
        };

        if weights.is_empty() {
            return Err(missing("*.safetensors weights"));
        }

        Ok(Self {
            config,
            tokenizer,
            weights,
        })
    }
}

pub struct ModelLoader {
    family: ModelFamily,
    settings: ProviderSettings,
    device: Device,
    dtype: DType,
}

impl ModelLoader {
    pub fn new(family: ModelFamily, settings: &ProviderSettings) -> Result<Self> {
        let device = Device::cuda_if_available(0)?;
        let dtype = if device.is_cuda() {
            DType::BF16
        } else {
            DType::F32
        };

        Ok(Self {
            family,
            settings: settings.clone(),
            device,
            dtype,
        })
    }

    pub fn load(&self) -> Result<ModelRuntime> {
        let start = Instant::now();
        let base_model = &self.settings.base_model;

        if !arch::has_architecture(self.family) {
            return Err(InferenceError::UnsupportedArchitecture {
                family: self.family.to_string(),
                path: base_model.clone(),
            });
        }
        if self.settings.load_8bit {
            warn!(dtype = ?self.dtype, "8-bit loading is unavailable, loading unquantized weights");
        }
        if let Some(adapter) = &self.settings.adapter_weights {
            warn!(adapter = %adapter.display(), "adapter weights are not merged");
        }

        let files = ModelFiles::discover(base_model)?;
        let tokenizer = ModelTokenizer::from_file(&files.tokenizer, self.family)?;

        // Weights stay memory-mapped for the lifetime of the model.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&files.weights, self.dtype, &self.device)?
        };
        let model = arch::load(self.family, &files, vb, self.dtype, &self.device)?;

        info!(
            family = %self.family,
            device = ?self.device,
            shards = files.weights.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "model loaded"
        );
        Ok(ModelRuntime::new(model, tokenizer, self.device.clone()))
    }
}
