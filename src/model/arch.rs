//! candle-transformers architectures behind one causal LM surface.

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::{chatglm, llama, mixtral, phi, qwen2};

use super::loader::ModelFiles;
use crate::config::ModelFamily;
use crate::error::{InferenceError, Result};

pub(crate) trait CausalLm: Send {
    /// Run `input_ids` (shape `(1, seq)`) placed at `seqlen_offset`; returns raw logits.
    fn forward(
        &mut self,
        input_ids: &Tensor,
        seqlen_offset: usize,
    ) -> candle_core::Result<Tensor>;

    /// Drop any key/value state so the next call starts a new sequence.
    fn reset(&mut self) -> candle_core::Result<()>;
}

pub(crate) fn has_architecture(family: ModelFamily) -> bool {
    !matches!(family, ModelFamily::Bloom | ModelFamily::Baichuan)
}

pub(crate) fn load(
    family: ModelFamily,
    files: &ModelFiles,
    vb: VarBuilder<'static>,
    dtype: DType,
    device: &Device,
) -> Result<Box<dyn CausalLm>> {
    let model: Box<dyn CausalLm> = match family {
        ModelFamily::Llama | ModelFamily::Llama2 => {
            let config: llama::LlamaConfig =
                serde_json::from_slice(&std::fs::read(&files.config)?)?;
            let config = config.into_config(false);
            let model = llama::Llama::load(vb, &config)?;
            let cache = llama::Cache::new(true, dtype, &config, device)?;
            Box::new(LlamaLm {
                model,
                cache,
                config,
                dtype,
                device: device.clone(),
            })
        }
        ModelFamily::Qwen => {
            let config: qwen2::Config = serde_json::from_slice(&std::fs::read(&files.config)?)?;
            Box::new(Qwen2Lm(qwen2::ModelForCausalLM::new(&config, vb)?))
        }
        ModelFamily::Phi => {
            let config: phi::Config = serde_json::from_slice(&std::fs::read(&files.config)?)?;
            Box::new(PhiLm(phi::Model::new(&config, vb)?))
        }
        ModelFamily::Mixtral => {
            let config = mixtral::Config::v0_1_8x7b(false);
            let model = mixtral::Model::new(&config, vb.clone())?;
            Box::new(MixtralLm { model, config, vb })
        }
        ModelFamily::ChatGlm | ModelFamily::ChatGlm2 => {
            let config = chatglm::Config::glm3_6b();
            let model = chatglm::Model::new(&config, vb.clone())?;
            Box::new(ChatGlmLm { model, config, vb })
        }
        ModelFamily::Bloom | ModelFamily::Baichuan => {
            return Err(InferenceError::UnsupportedArchitecture {
                family: family.to_string(),
                path: files.config.clone(),
            })
        }
    };
    Ok(model)
}

/// Reduce model output to the 1-D F32 logits of the last position.
pub(crate) fn last_position_logits(logits: Tensor) -> candle_core::Result<Tensor> {
    let mut logits = logits;
    while logits.rank() > 1 {
        let last = logits.dim(0)? - 1;
        logits = logits.get(last)?;
    }
    logits.to_dtype(DType::F32)
}

struct LlamaLm {
    model: llama::Llama,
    cache: llama::Cache,
    config: llama::Config,
    dtype: DType,
    device: Device,
}

impl CausalLm for LlamaLm {
    fn forward(
        &mut self,
        input_ids: &Tensor,
        seqlen_offset: usize,
    ) -> candle_core::Result<Tensor> {
        self.model.forward(input_ids, seqlen_offset, &mut self.cache)
    }

    fn reset(&mut self) -> candle_core::Result<()> {
        self.cache = llama::Cache::new(true, self.dtype, &self.config, &self.device)?;
        Ok(())
    }
}

struct Qwen2Lm(qwen2::ModelForCausalLM);

impl CausalLm for Qwen2Lm {
    fn forward(
        &mut self,
        input_ids: &Tensor,
        seqlen_offset: usize,
    ) -> candle_core::Result<Tensor> {
        self.0.forward(input_ids, seqlen_offset)
    }

    fn reset(&mut self) -> candle_core::Result<()> {
        self.0.clear_kv_cache();
        Ok(())
    }
}

// Phi tracks its own offset in the kv cache.
struct PhiLm(phi::Model);

impl CausalLm for PhiLm {
    fn forward(
        &mut self,
        input_ids: &Tensor,
        _seqlen_offset: usize,
    ) -> candle_core::Result<Tensor> {
        self.0.forward(input_ids)
    }

    fn reset(&mut self) -> candle_core::Result<()> {
        self.0.clear_kv_cache();
        Ok(())
    }
}

// Mixtral and ChatGLM keep their kv cache private; a reset rebuilds them from
// the memory-mapped weights.
struct MixtralLm {
    model: mixtral::Model,
    config: mixtral::Config,
    vb: VarBuilder<'static>,
}

impl CausalLm for MixtralLm {
    fn forward(
        &mut self,
        input_ids: &Tensor,
        seqlen_offset: usize,
    ) -> candle_core::Result<Tensor> {
        self.model.forward(input_ids, seqlen_offset)
    }

    fn reset(&mut self) -> candle_core::Result<()> {
        self.model = mixtral::Model::new(&self.config, self.vb.clone())?;
        Ok(())
    }
}

struct ChatGlmLm {
    model: chatglm::Model,
    config: chatglm::Config,
    vb: VarBuilder<'static>,
}

impl CausalLm for ChatGlmLm {
    fn forward(
        &mut self,
        input_ids: &Tensor,
        _seqlen_offset: usize,
    ) -> candle_core::Result<Tensor> {
        self.model.forward(input_ids)
    }

    fn reset(&mut self) -> candle_core::Result<()> {
        self.model = chatglm::Model::new(&self.config, self.vb.clone())?;
        Ok(())
    }
}
