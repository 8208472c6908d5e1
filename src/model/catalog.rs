//! Static catalog of supported GGUF models
//!
//! Maps a short id to the Hugging Face repository and file holding the
//! quantized weights, the repository the tokenizer is fetched from, and the
//! chat template the model was tuned on.

use super::ChatTemplate;

/// Model loaded when nothing else is configured
pub const DEFAULT_MODEL: &str = "qwen1_5b";

/// One downloadable model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: &'static str,
    /// Repository holding the GGUF file
    pub repo: &'static str,
    /// GGUF file name inside `repo`
    pub file: &'static str,
    /// Repository holding `tokenizer.json`
    pub tokenizer_repo: &'static str,
    pub template: ChatTemplate,
}

impl CatalogEntry {
    /// File name the tokenizer is stored under, next to the weights.
    pub fn tokenizer_file(&self) -> String {
        super::tokenizer_file_for(self.file)
    }
}

pub const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        id: "llama",
        repo: "hugging-quants/Llama-3.2-1B-Instruct-Q4_K_M-GGUF",
        file: "llama-3.2-1b-instruct-q4_k_m.gguf",
        tokenizer_repo: "unsloth/Llama-3.2-1B-Instruct",
        template: ChatTemplate::Llama3,
    },
    CatalogEntry {
        id: "qwen",
        repo: "medmekk/Qwen2.5-0.5B-Instruct.GGUF",
        file: "Qwen2.5-0.5B-Instruct-Q5_K_S.gguf",
        tokenizer_repo: "Qwen/Qwen2.5-0.5B-Instruct",
        template: ChatTemplate::ChatMl,
    },
    CatalogEntry {
        id: "qwen1_5b",
        repo: "medmekk/Qwen2.5-1.5B-Instruct.GGUF",
        file: "Qwen2.5-1.5B-Instruct-Q8_0.gguf",
        tokenizer_repo: "Qwen/Qwen2.5-1.5B-Instruct",
        template: ChatTemplate::ChatMl,
    },
    CatalogEntry {
        id: "deepseek",
        repo: "unsloth/DeepSeek-R1-Distill-Qwen-1.5B-GGUF",
        file: "DeepSeek-R1-Distill-Qwen-1.5B-Q5_K_M.gguf",
        tokenizer_repo: "deepseek-ai/DeepSeek-R1-Distill-Qwen-1.5B",
        template: ChatTemplate::DeepSeekR1,
    },
    CatalogEntry {
        id: "smollm",
        repo: "bartowski/SmolLM2-1.7B-Instruct-GGUF",
        file: "SmolLM2-1.7B-Instruct-Q5_K_M.gguf",
        tokenizer_repo: "HuggingFaceTB/SmolLM2-1.7B-Instruct",
        template: ChatTemplate::ChatMl,
    },
    CatalogEntry {
        id: "mistral",
        repo: "TheBloke/Mistral-7B-v0.1-GGUF",
        file: "mistral-7b-v0.1.Q5_K_M.gguf",
        tokenizer_repo: "mistralai/Mistral-7B-v0.1",
        template: ChatTemplate::Mistral,
    },
    CatalogEntry {
        id: "croissant",
        repo: "DavidAU/French-Alpaca-Croissant-1.3B-Instruct-Q6_K-GGUF",
        file: "french-alpaca-croissant-1.3b-instruct.Q6_K.gguf",
        tokenizer_repo: "jpacifico/French-Alpaca-Croissant-1.3B-Instruct",
        template: ChatTemplate::Alpaca,
    },
];

/// Find a catalog entry by id (case-insensitive).
pub fn lookup(id: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|entry| entry.id.eq_ignore_ascii_case(id))
}

/// Find the catalog entry whose GGUF file name matches.
pub fn lookup_by_file(file: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|entry| entry.file == file)
}
