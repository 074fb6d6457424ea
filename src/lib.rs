//! TryLLM - run LLaMA, ChatGLM, BLOOM, Qwen, Baichuan, Mixtral and Phi models
//!
//! A single configuration picks a `(task_type, model_type)` pair, the dispatch
//! table turns it into one provider, and the provider either answers a batch
//! request from the command line or backs the browser chat demo.

use std::fmt;

use candle_core::Device;

// Public modules
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod model;
pub mod provider;
pub mod render;
pub mod types;
pub mod utils;
pub mod web;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-exports for public API
pub use cli::Args;
pub use config::{InferenceConfig, ModelFamily, TaskType};
pub use dispatch::{build_provider, resolve, DispatchError, ProviderKind};
pub use engine::{run_batch, ChatBackend, ChatEngine, EngineBuilder};
pub use error::{ErrorExt, InferenceError, Result};
pub use provider::{Generate, GenerateRequest, Provider};
pub use render::render_chat_text;
pub use types::{History, Response};

/// Feature detection for supported backends
pub struct Features {
    /// Whether CUDA support is enabled
    pub cuda: bool,
}

impl Features {
    /// Detect available features at runtime
    pub fn detect() -> Self {
        #[cfg(feature = "cuda")]
        let cuda = Device::cuda_if_available(0)
            .map(|device| device.is_cuda())
            .unwrap_or(false);

        #[cfg(not(feature = "cuda"))]
        let cuda = Device::Cpu.is_cuda();

        Self { cuda }
    }
}

impl fmt::Display for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CUDA support: {}", if self.cuda { "yes" } else { "no" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_detection() {
        let features = Features::detect();
        #[cfg(not(feature = "cuda"))]
        assert!(!features.cuda);
        assert!(features.to_string().starts_with("CUDA support: "));
    }

    #[test]
    fn test_version_number() {
        assert!(!VERSION.is_empty());
    }
}
