//! Word definitions generated by the loaded model

mod query;
mod service;

pub use query::{DictionaryQuery, DictionaryRequest, DEFAULT_ANSWER_LANGUAGE};
pub use service::DictionaryService;
