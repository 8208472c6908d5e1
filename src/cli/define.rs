//! One-shot definition command

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::LexrConfig;
use crate::dictionary::{DictionaryRequest, DictionaryService};
use crate::engine::ModelLifecycle;
use crate::loader;

/// Load the model, define one word and print the answer
pub async fn define(
    word: String,
    lang: String,
    phrase: Option<String>,
    answer_lang: Option<String>,
    model: Option<String>,
    config: Option<PathBuf>,
) -> Result<()> {
    let mut config = LexrConfig::load(config.as_deref())?;
    if let Some(model) = model {
        config.inference.model = model;
    }

    tracing::info!("Loading model: {}", config.inference.model);
    let lifecycle = Arc::new(ModelLifecycle::new(1));
    lifecycle
        .load(loader::load_engine(config.inference.clone()))
        .await?;

    let service = DictionaryService::from_config(lifecycle.clone(), &config);
    let request = DictionaryRequest {
        word: Some(word),
        lang: Some(lang),
        phrase,
        answer_lang,
    };
    let result = service.define(request).await;

    lifecycle.shutdown(Duration::from_secs(5)).await;

    println!("{}", result?);
    Ok(())
}
