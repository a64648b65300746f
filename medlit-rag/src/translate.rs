//! Query translation through a chat capability provider.

use std::sync::Arc;

use medlit_model::{ChatModel, ChatRequest};
use serde::Deserialize;
use tracing::{error, info};

use crate::error::{PipelineError, Result};

const TRANSLATE_SYSTEM: &str = "You are an assistant that analyzes and translates text, \
     returning the result in a specific JSON format.";

/// Result of translating (or passing through) a query.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationOutcome {
    /// The query as the user submitted it.
    pub original: String,
    /// The English query used for embedding.
    pub translated: String,
    /// Whether the provider was actually invoked.
    pub was_translated: bool,
    /// Language the provider identified, `"English"` for passthrough.
    pub source_language: String,
}

impl TranslationOutcome {
    /// A passthrough outcome for queries that need no translation.
    pub fn passthrough(text: &str) -> Self {
        Self {
            original: text.to_string(),
            translated: text.to_string(),
            was_translated: false,
            source_language: "English".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct TranslationReply {
    translated_text: String,
    #[serde(default)]
    source_language: Option<String>,
}

/// Translates non-English queries to English before embedding.
///
/// One provider call per translation, asking for a JSON object with the
/// identified source language and the translated text. A provider
/// failure is terminal for the request: an untranslated non-English
/// query would silently degrade retrieval quality, so there is no
/// fallback to the original text.
pub struct Translator {
    model: Arc<dyn ChatModel>,
}

impl Translator {
    /// Create a translator over the given chat model.
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Translate the query to English.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Provider`] if the provider call fails,
    /// and a chat-provider error if the reply is not the requested JSON
    /// shape.
    pub async fn translate(&self, text: &str) -> Result<TranslationOutcome> {
        let prompt = format!(
            "You are a language analysis and translation expert. Your task is to analyze \
             the following text.\n\
             1. Identify the source language. Distinguish between \"English\", \
             \"Simplified Chinese\", and \"Traditional Chinese\". For other languages, \
             identify them by name (e.g., \"Japanese\").\n\
             2. Translate the text to English. Keep English terms unchanged, only \
             translate non-English parts.\n\n\
             Return a single JSON object with two keys: \"source_language\" and \
             \"translated_text\".\n\n\
             User Text: \"{text}\""
        );

        let request = ChatRequest::new(TRANSLATE_SYSTEM, prompt)
            .with_max_tokens(200)
            .with_temperature(0.1)
            .with_json_output();

        let reply = self.model.complete(request).await.map_err(|e| {
            error!(error = %e, "translation provider failed");
            PipelineError::Provider(e)
        })?;

        let parsed: TranslationReply = serde_json::from_str(&reply).map_err(|e| {
            error!(error = %e, "translation reply was not the requested JSON shape");
            PipelineError::Provider(medlit_model::ModelError::Chat {
                provider: self.model.name().to_string(),
                message: format!("malformed translation reply: {e}"),
            })
        })?;

        let source_language =
            parsed.source_language.unwrap_or_else(|| "unknown".to_string());
        info!(%source_language, "translated query");

        Ok(TranslationOutcome {
            original: text.to_string(),
            translated: parsed.translated_text,
            was_translated: true,
            source_language,
        })
    }
}
