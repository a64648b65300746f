//! Wire types and event serialization.
//!
//! The pipeline produces typed outcomes and events; this module is the
//! single place they are mapped to the JSON shapes the client expects.

use medlit_rag::{PipelineEvent, RagOutcome, SearchOutcome, TranslationDetail};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Body of `POST /api/search` and `POST /api/search_with_progress`.
#[derive(Debug, Deserialize)]
pub struct SearchBody {
    /// The free-text query.
    pub query: String,
    /// Result count; the server default (10) when absent.
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Body of `POST /api/rag_qa` and `POST /api/rag_qa_with_progress`.
#[derive(Debug, Deserialize)]
pub struct QaBody {
    /// The free-text question.
    pub question: String,
    /// Retrieval count; the server default (20) when absent.
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Body of `POST /api/translate`.
#[derive(Debug, Deserialize)]
pub struct TranslateBody {
    /// The text to translate.
    pub query: String,
}

/// Error body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// User-visible error description.
    pub error: String,
}

/// The synchronous search response shape.
pub fn search_response(outcome: &SearchOutcome) -> Value {
    json!({
        "original_query": outcome.original_query,
        "translated_query": outcome.translated_query,
        "total_results": outcome.results.len(),
        "results": outcome.results,
    })
}

/// The synchronous RAG response shape.
pub fn rag_response(outcome: &RagOutcome) -> Value {
    json!({
        "original_question": outcome.original_question,
        "translated_question": outcome.translated_question,
        "answer": outcome.answer,
        "relevant_articles": outcome.relevant_articles,
        "articles_used": outcome.articles_used,
    })
}

/// Serialize one pipeline event to the JSON carried in a `data:` line.
///
/// Progress events become `{step, progress}` with the translation detail
/// under `translation_info` / `translation_result`; terminal events
/// become the synchronous response shape plus `"complete": true`, or
/// `{error}` on failure.
pub fn event_json(event: &PipelineEvent) -> String {
    match event {
        PipelineEvent::Stage(stage) => {
            let mut body = json!({
                "step": stage.label,
                "progress": stage.progress,
            });
            match &stage.translation {
                Some(TranslationDetail::Original(original)) => {
                    body["translation_info"] = json!(format!("Original: {original}"));
                }
                Some(TranslationDetail::Translated(translated)) => {
                    body["translation_result"] = json!(format!("Translated: {translated}"));
                }
                None => {}
            }
            body.to_string()
        }
        PipelineEvent::SearchComplete(outcome) => {
            let mut body = search_response(outcome);
            body["complete"] = json!(true);
            body.to_string()
        }
        PipelineEvent::RagComplete(outcome) => {
            let mut body = rag_response(outcome);
            body["complete"] = json!(true);
            body.to_string()
        }
        PipelineEvent::Failed { message } => json!({ "error": message }).to_string(),
    }
}
