//! Model identity: the static catalog and chat prompt templates.

pub mod catalog;

pub use catalog::{CatalogEntry, CATALOG, DEFAULT_MODEL};

use serde::{Deserialize, Serialize};

/// Tokenizer file name stored next to a GGUF file.
pub fn tokenizer_file_for(gguf_file: &str) -> String {
    let stem = gguf_file.strip_suffix(".gguf").unwrap_or(gguf_file);
    format!("{}.tokenizer.json", stem)
}

/// Prompt format an instruct model was tuned on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatTemplate {
    /// `<|im_start|>` / `<|im_end|>` (Qwen, SmolLM)
    #[default]
    ChatMl,
    /// Llama 3 header tokens
    Llama3,
    /// `[INST]` blocks
    Mistral,
    /// DeepSeek-R1 distills; answers open with a `<think>` block
    DeepSeekR1,
    /// `### Instruction:` / `### Response:`
    Alpaca,
}

impl ChatTemplate {
    /// Render a single-turn conversation ending where the assistant speaks.
    pub fn render(&self, system: &str, user: &str) -> String {
        match self {
            ChatTemplate::ChatMl => format!(
                "<|im_start|>system\n{system}<|im_end|>\n<|im_start|>user\n{user}<|im_end|>\n<|im_start|>assistant\n"
            ),
            ChatTemplate::Llama3 => format!(
                "<|begin_of_text|><|start_header_id|>system<|end_header_id|>\n\n{system}<|eot_id|>\
                 <|start_header_id|>user<|end_header_id|>\n\n{user}<|eot_id|>\
                 <|start_header_id|>assistant<|end_header_id|>\n\n"
            ),
            ChatTemplate::Mistral => format!("<s>[INST] {system}\n\n{user} [/INST]"),
            ChatTemplate::DeepSeekR1 => {
                format!("<｜begin▁of▁sentence｜>{system}<｜User｜>{user}<｜Assistant｜>")
            }
            ChatTemplate::Alpaca => format!(
                "{system}\n\n### Instruction:\n{user}\n\n### Response:\n"
            ),
        }
    }

    /// Special tokens that end the assistant turn.
    pub fn stop_tokens(&self) -> &'static [&'static str] {
        match self {
            ChatTemplate::ChatMl => &["<|im_end|>", "<|endoftext|>"],
            ChatTemplate::Llama3 => &["<|eot_id|>", "<|end_of_text|>"],
            ChatTemplate::Mistral | ChatTemplate::Alpaca => &["</s>"],
            ChatTemplate::DeepSeekR1 => &["<｜end▁of▁sentence｜>"],
        }
    }

    /// Strip template artifacts from a decoded answer.
    pub fn clean_output(&self, raw: &str) -> String {
        let text = match self {
            ChatTemplate::DeepSeekR1 => match raw.find("</think>") {
                Some(end) => &raw[end + "</think>".len()..],
                None => raw,
            },
            ChatTemplate::Alpaca => raw.split("### Instruction").next().unwrap_or(raw),
            _ => raw,
        };
        text.trim().to_string()
    }
}
