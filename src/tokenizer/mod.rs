use std::path::Path;

use anyhow::{anyhow, Result};

/// Trait for tokenizers used by lexr
///
/// Engines only need encode/decode and special-token lookups, which keeps
/// them independent of the tokenizer file format.
pub trait TokenizerTrait: Send + Sync {
    /// Encode text to token IDs. Special tokens written in the text are
    /// recognized; none are added.
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Decode token IDs to text, dropping special tokens
    fn decode(&self, ids: &[u32]) -> Result<String>;

    /// Id of a token string, if the vocabulary has it
    fn token_id(&self, token: &str) -> Option<u32>;

    /// Get vocabulary size
    fn vocab_size(&self) -> usize;
}

/// Tokenizer backed by a HuggingFace `tokenizer.json`.
pub struct Tokenizer {
    inner: tokenizers::Tokenizer,
}

impl Tokenizer {
    /// Load a `tokenizer.json` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let inner = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| anyhow!("Failed to load tokenizer '{}': {}", path.display(), e))?;
        Ok(Self { inner })
    }
}

impl TokenizerTrait for Tokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        self.inner
            .decode(ids, true)
            .map_err(|e| anyhow!("Decode error: {}", e))
    }

    fn token_id(&self, token: &str) -> Option<u32> {
        self.inner.token_to_id(token)
    }

    fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORD_LEVEL: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {"[UNK]": 0, "hello": 1, "world": 2},
            "unk_token": "[UNK]"
        }
    }"#;

    fn word_level() -> Tokenizer {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokenizer.json");
        std::fs::write(&path, WORD_LEVEL).unwrap();
        Tokenizer::from_file(&path).unwrap()
    }

    #[test]
    fn test_encode_and_lookup() {
        let tokenizer = word_level();
        assert_eq!(tokenizer.encode("hello world").unwrap(), vec![1, 2]);
        assert_eq!(tokenizer.token_id("world"), Some(2));
        assert_eq!(tokenizer.token_id("<|im_end|>"), None);
        assert_eq!(tokenizer.vocab_size(), 3);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = Tokenizer::from_file("/nonexistent/tokenizer.json")
            .err()
            .unwrap();
        assert!(err.to_string().contains("/nonexistent/tokenizer.json"));
    }
}
