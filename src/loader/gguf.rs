//! GGUF model loading
//!
//! GGUF files carry weights and metadata together; the architecture named in
//! the metadata picks the candle model implementation.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use candle_core::quantized::gguf_file::{Content, Value};
use candle_core::Device;
use candle_transformers::models::{quantized_llama, quantized_qwen2};

use crate::engine::QuantizedWeights;
use crate::model::ChatTemplate;

/// Model families with a quantized candle implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    /// llama and mistral share the quantized llama graph
    Llama,
    Mistral,
    Qwen2,
}

impl Architecture {
    /// Map `general.architecture` to a supported family.
    pub fn from_gguf_name(name: &str) -> Result<Self> {
        match name {
            "llama" => Ok(Architecture::Llama),
            "mistral" => Ok(Architecture::Mistral),
            "qwen2" => Ok(Architecture::Qwen2),
            other => Err(anyhow!(
                "Unsupported GGUF architecture '{}' (supported: llama, mistral, qwen2)",
                other
            )),
        }
    }

    /// Chat template used when neither config nor catalog names one.
    pub fn default_template(&self) -> ChatTemplate {
        match self {
            Architecture::Llama => ChatTemplate::Llama3,
            Architecture::Mistral => ChatTemplate::Mistral,
            Architecture::Qwen2 => ChatTemplate::ChatMl,
        }
    }
}

/// Metadata read from a GGUF header
#[derive(Debug, Clone)]
pub struct GgufInfo {
    pub architecture: Architecture,
    /// Training context length, if recorded
    pub context_length: Option<usize>,
    pub tensor_count: usize,
}

impl GgufInfo {
    fn from_content(content: &Content) -> Result<Self> {
        let name = match content.metadata.get("general.architecture") {
            Some(Value::String(name)) => name.as_str(),
            _ => return Err(anyhow!("GGUF missing general.architecture")),
        };
        let architecture = Architecture::from_gguf_name(name)?;
        let context_length = content
            .metadata
            .get(&format!("{}.context_length", name))
            .and_then(|v| v.to_u32().ok())
            .map(|v| v as usize);

        Ok(Self {
            architecture,
            context_length,
            tensor_count: content.tensor_infos.len(),
        })
    }
}

/// Read only the GGUF header of `path`.
pub fn get_gguf_info<P: AsRef<Path>>(path: P) -> Result<GgufInfo> {
    let (content, _) = open(path.as_ref())?;
    GgufInfo::from_content(&content)
}

/// Load the quantized weights in `path` onto `device`.
pub fn load_gguf<P: AsRef<Path>>(path: P, device: &Device) -> Result<(QuantizedWeights, GgufInfo)> {
    let path = path.as_ref();
    let (content, mut reader) = open(path)?;
    let info = GgufInfo::from_content(&content)?;

    let weights = match info.architecture {
        Architecture::Llama | Architecture::Mistral => QuantizedWeights::Llama(
            quantized_llama::ModelWeights::from_gguf(content, &mut reader, device)
                .map_err(|e| anyhow!("Failed to load model: {}", e))?,
        ),
        Architecture::Qwen2 => QuantizedWeights::Qwen2(
            quantized_qwen2::ModelWeights::from_gguf(content, &mut reader, device)
                .map_err(|e| anyhow!("Failed to load model: {}", e))?,
        ),
    };

    tracing::info!(
        "Loaded {} tensors from GGUF ({:?})",
        info.tensor_count,
        info.architecture
    );
    Ok((weights, info))
}

fn open(path: &Path) -> Result<(Content, BufReader<File>)> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open GGUF file {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let content =
        Content::read(&mut reader).map_err(|e| anyhow!("Failed to parse GGUF file: {}", e))?;
    Ok((content, reader))
}
