//! Model loading utilities
//!
//! Resolves the configured model to files on disk, picks the device and
//! builds a ready [`CandleEngine`].

mod detect;
mod gguf;

pub use detect::{detect_model_source, ModelSource};
pub use gguf::{get_gguf_info, load_gguf, Architecture, GgufInfo};

use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use candle_core::Device;

use crate::config::{DeviceConfig, InferenceConfig};
use crate::engine::{CandleEngine, ModelEngine};
use crate::model::ChatTemplate;
use crate::tokenizer::Tokenizer;

/// Create the candle device described by `config`.
pub fn device_for(config: &DeviceConfig) -> Result<Device> {
    match config.device_type() {
        "cpu" => Ok(Device::Cpu),
        "cuda" => Device::new_cuda(config.device_id())
            .map_err(|e| anyhow!("CUDA device {} unavailable: {}", config.device_id(), e)),
        "metal" => Device::new_metal(config.device_id())
            .map_err(|e| anyhow!("Metal device {} unavailable: {}", config.device_id(), e)),
        other => Err(anyhow!("Unknown device type: {}", other)),
    }
}

/// Template precedence: explicit config, then catalog, then architecture.
pub fn resolve_template(config: &InferenceConfig, architecture: Architecture) -> ChatTemplate {
    config
        .template
        .or_else(|| config.catalog_entry().map(|entry| entry.template))
        .unwrap_or_else(|| architecture.default_template())
}

/// Load the configured model. Blocking; run it off the async runtime.
pub fn load_model(config: &InferenceConfig) -> Result<CandleEngine> {
    let start = Instant::now();
    let path = config.model_path();
    let source = detect_model_source(&path, config.tokenizer_path.as_deref())?;
    tracing::info!("Loading model from {}", source.weights_path.display());

    let device = device_for(&config.device)?;
    let (weights, info) = load_gguf(&source.weights_path, &device)?;

    if let Some(trained) = info.context_length {
        if config.context_size > trained {
            tracing::warn!(
                "context_size {} exceeds the model's trained context of {}",
                config.context_size,
                trained
            );
        }
    }

    let tokenizer = Tokenizer::from_file(&source.tokenizer_path)?;
    let template = resolve_template(config, info.architecture);
    let engine = CandleEngine::new(weights, Arc::new(tokenizer), template, device)?;

    tracing::info!(
        "Model loaded in {:.1}s ({:?} template)",
        start.elapsed().as_secs_f64(),
        template
    );
    Ok(engine)
}

/// Load the configured model on a blocking thread.
pub async fn load_engine(config: InferenceConfig) -> Result<Arc<dyn ModelEngine>> {
    let engine = tokio::task::spawn_blocking(move || load_model(&config))
        .await
        .context("model loader panicked")??;
    Ok(Arc::new(engine))
}
