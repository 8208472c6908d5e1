//! Dictionary request validation and prompt construction

use serde::{Deserialize, Serialize};

use crate::error::InferenceError;

/// Language answers are written in when the client names none
pub const DEFAULT_ANSWER_LANGUAGE: &str = "french";

/// Body of `POST /dictionary`, as sent by clients
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phrase: Option<String>,
    #[serde(
        rename = "answerLang",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub answer_lang: Option<String>,
}

/// A validated lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryQuery {
    pub word: String,
    pub source_language: String,
    pub phrase: Option<String>,
    pub answer_language: String,
}

impl DictionaryQuery {
    /// The user turn sent to the model.
    pub fn prompt(&self) -> String {
        match &self.phrase {
            Some(phrase) => format!(
                "In the phrase \"{}\", what does \"{}\" mean? Answer in {}.",
                phrase, self.word, self.answer_language
            ),
            None => format!(
                "What is the definition of the {} word \"{}\"? Answer in {}.",
                self.source_language, self.word, self.answer_language
            ),
        }
    }
}

impl TryFrom<DictionaryRequest> for DictionaryQuery {
    type Error = InferenceError;

    fn try_from(request: DictionaryRequest) -> Result<Self, Self::Error> {
        let word = non_empty(request.word)
            .ok_or_else(|| InferenceError::InvalidArgument("no word provided".to_string()))?;
        let source_language = non_empty(request.lang)
            .ok_or_else(|| InferenceError::InvalidArgument("no lang provided".to_string()))?;

        Ok(Self {
            word,
            source_language,
            phrase: non_empty(request.phrase),
            answer_language: non_empty(request.answer_lang)
                .unwrap_or_else(|| DEFAULT_ANSWER_LANGUAGE.to_string()),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
