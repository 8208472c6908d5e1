//! Inference executor
//!
//! Runs quantized GGUF models with candle. The weights carry their own KV
//! cache, so a session takes exclusive ownership of them for its lifetime;
//! a forward pass at position 0 starts a fresh conversation.

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use candle_core::{DType, Device, Tensor};
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::{quantized_llama, quantized_qwen2};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{CancelToken, ChatSession, ModelEngine, SessionParams};
use crate::config::GenerationConfig;
use crate::model::ChatTemplate;
use crate::tokenizer::TokenizerTrait;

/// Quantized weights for the supported architectures
pub enum QuantizedWeights {
    /// llama, mistral
    Llama(quantized_llama::ModelWeights),
    Qwen2(quantized_qwen2::ModelWeights),
}

impl QuantizedWeights {
    /// Run `input` (shape `[1, seq]`) starting at `index_pos`; returns the
    /// logits of the last position.
    pub fn forward(&mut self, input: &Tensor, index_pos: usize) -> candle_core::Result<Tensor> {
        match self {
            QuantizedWeights::Llama(model) => model.forward(input, index_pos),
            QuantizedWeights::Qwen2(model) => model.forward(input, index_pos),
        }
    }
}

type WeightsSlot = Arc<Mutex<Option<QuantizedWeights>>>;

/// A loaded GGUF model
pub struct CandleEngine {
    weights: WeightsSlot,
    tokenizer: Arc<dyn TokenizerTrait>,
    template: ChatTemplate,
    device: Device,
    /// Token ids that end the assistant turn
    stop_ids: Vec<u32>,
}

impl CandleEngine {
    pub fn new(
        weights: QuantizedWeights,
        tokenizer: Arc<dyn TokenizerTrait>,
        template: ChatTemplate,
        device: Device,
    ) -> Result<Self> {
        let stop_ids: Vec<u32> = template
            .stop_tokens()
            .iter()
            .filter_map(|token| tokenizer.token_id(token))
            .collect();
        if stop_ids.is_empty() {
            bail!(
                "tokenizer does not know any stop token of the {:?} template",
                template
            );
        }

        tracing::debug!(
            "Engine ready: template={:?}, vocab={}, stop_ids={:?}",
            template,
            tokenizer.vocab_size(),
            stop_ids
        );

        Ok(Self {
            weights: Arc::new(Mutex::new(Some(weights))),
            tokenizer,
            template,
            device,
            stop_ids,
        })
    }

    pub fn template(&self) -> ChatTemplate {
        self.template
    }
}

impl ModelEngine for CandleEngine {
    fn create_session(&self, params: &SessionParams) -> Result<Box<dyn ChatSession>> {
        // blocks until the previous session hands the weights back
        let guard = Arc::clone(&self.weights).blocking_lock_owned();
        if guard.is_none() {
            bail!("model weights have been released");
        }

        Ok(Box::new(CandleSession {
            weights: Some(guard),
            tokenizer: Arc::clone(&self.tokenizer),
            template: self.template,
            device: self.device.clone(),
            stop_ids: self.stop_ids.clone(),
            params: params.clone(),
        }))
    }

    fn release(&self) {
        match self.weights.try_lock() {
            Ok(mut weights) => {
                weights.take();
            }
            Err(_) => tracing::warn!("Model weights still in use, leaving them to the session"),
        }
    }
}

/// A single-turn chat session holding the model weights
pub struct CandleSession {
    weights: Option<OwnedMutexGuard<Option<QuantizedWeights>>>,
    tokenizer: Arc<dyn TokenizerTrait>,
    template: ChatTemplate,
    device: Device,
    stop_ids: Vec<u32>,
    params: SessionParams,
}

impl ChatSession for CandleSession {
    fn prompt(
        &mut self,
        text: &str,
        config: &GenerationConfig,
        cancel: &CancelToken,
    ) -> Result<String> {
        let weights = self
            .weights
            .as_mut()
            .and_then(|guard| guard.as_mut())
            .ok_or_else(|| anyhow!("session already disposed"))?;

        let rendered = self.template.render(&self.params.system_prompt, text);
        let prompt_tokens = self.tokenizer.encode(&rendered)?;
        if prompt_tokens.is_empty() {
            bail!("prompt encoded to zero tokens");
        }
        if prompt_tokens.len() >= self.params.context_size {
            bail!(
                "prompt of {} tokens does not fit a context of {}",
                prompt_tokens.len(),
                self.params.context_size
            );
        }

        let budget = config
            .max_tokens
            .min(self.params.context_size - prompt_tokens.len());
        let mut sampler = sampler_for(config);

        let input = Tensor::new(prompt_tokens.as_slice(), &self.device)?.unsqueeze(0)?;
        let mut logits = weights.forward(&input, 0)?;
        tracing::debug!("Prefill complete ({} tokens)", prompt_tokens.len());

        let mut generated = Vec::with_capacity(budget);
        for index in 0..budget {
            if cancel.is_cancelled() {
                bail!("generation cancelled after {} tokens", generated.len());
            }

            let last = logits.squeeze(0)?.to_dtype(DType::F32)?;
            let next = sampler.sample(&last)?;
            if self.stop_ids.contains(&next) {
                tracing::debug!("Hit stop token, stopping generation");
                break;
            }
            generated.push(next);

            if index + 1 < budget {
                let input = Tensor::new(&[next], &self.device)?.unsqueeze(0)?;
                logits = weights.forward(&input, prompt_tokens.len() + index)?;
            }
        }

        let raw = self.tokenizer.decode(&generated)?;
        Ok(self.template.clean_output(&raw))
    }

    fn dispose(&mut self) {
        // returning the guard hands the weights to the next session
        self.weights.take();
    }
}

/// Build the token sampler for one generation.
fn sampler_for(config: &GenerationConfig) -> LogitsProcessor {
    let seed = config.seed.unwrap_or_else(rand::random);
    let sampling = if config.is_greedy() {
        Sampling::ArgMax
    } else {
        Sampling::TopKThenTopP {
            k: config.top_k,
            p: config.top_p,
            temperature: config.temperature,
        }
    };
    LogitsProcessor::from_sampling(seed, sampling)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logits() -> Tensor {
        Tensor::new(&[0.1f32, 2.5, 0.3, -1.0], &Device::Cpu).unwrap()
    }

    #[test]
    fn test_greedy_sampler_picks_argmax() {
        let mut sampler = sampler_for(&GenerationConfig::greedy());
        assert_eq!(sampler.sample(&logits()).unwrap(), 1);
    }

    #[test]
    fn test_top_k_of_one_is_deterministic() {
        let config = GenerationConfig {
            top_k: 1,
            seed: Some(7),
            ..Default::default()
        };
        let mut sampler = sampler_for(&config);
        for _ in 0..5 {
            assert_eq!(sampler.sample(&logits()).unwrap(), 1);
        }
    }
}
