//! Query expansion for the RAG flow.

use std::sync::Arc;

use medlit_model::{ChatModel, ChatRequest};
use serde_json::Value;
use tracing::{info, warn};

/// Expands a question into related biomedical search terms.
///
/// The question plus its expansions are embedded as a batch and averaged
/// into a single, more robust query vector. Expansion is an enhancement
/// stage: if the provider fails or returns an unusable shape, the flow
/// degrades to the unexpanded question with a warning rather than
/// failing the request.
pub struct QueryExpander {
    model: Arc<dyn ChatModel>,
}

impl QueryExpander {
    /// Create an expander over the given chat model.
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Produce 3–5 related search terms for the question.
    ///
    /// Returns an empty list when expansion is unavailable; the caller
    /// embeds the question alone in that case.
    pub async fn expand(&self, question: &str) -> Vec<String> {
        let prompt = format!(
            "You are a biomedical research query analyst. Your task is to expand a \
             user's query into a set of 3 to 5 semantically related, specific search \
             terms that are likely to appear in PubMed abstracts. Focus on academic \
             and technical vocabulary.\n\n\
             Return the result as a JSON array of strings. Only return the JSON \
             array, nothing else.\n\n\
             User Query: \"{question}\""
        );

        let request = ChatRequest::new(
            "You are a helpful assistant that provides expanded search terms in a \
             JSON array format.",
            prompt,
        )
        .with_max_tokens(200)
        .with_temperature(0.2)
        .with_json_output();

        let reply = match self.model.complete(request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "query expansion failed, continuing unexpanded");
                return Vec::new();
            }
        };

        let terms = parse_expansion_reply(&reply);
        if terms.is_empty() {
            warn!("query expansion returned no usable terms");
        } else {
            info!(term_count = terms.len(), "expanded query");
        }
        terms
    }
}

/// Pull a string array out of the provider reply.
///
/// JSON mode may wrap the array in an object under an arbitrary key
/// (e.g. `{"queries": [...]}`), so scan object values for the first
/// array of strings.
fn parse_expansion_reply(reply: &str) -> Vec<String> {
    let Ok(value) = serde_json::from_str::<Value>(reply) else {
        return Vec::new();
    };

    let array = match &value {
        Value::Array(items) => Some(items),
        Value::Object(map) => map.values().find_map(|v| v.as_array()),
        _ => None,
    };

    array
        .map(|items| {
            items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::parse_expansion_reply;

    #[test]
    fn parses_bare_array() {
        let terms = parse_expansion_reply(r#"["insulin resistance", "HbA1c"]"#);
        assert_eq!(terms, vec!["insulin resistance", "HbA1c"]);
    }

    #[test]
    fn parses_array_under_arbitrary_key() {
        let terms = parse_expansion_reply(r#"{"queries": ["metformin", "glycemic control"]}"#);
        assert_eq!(terms, vec!["metformin", "glycemic control"]);
    }

    #[test]
    fn non_json_reply_yields_nothing() {
        assert!(parse_expansion_reply("sorry, I can't").is_empty());
    }

    #[test]
    fn object_without_array_yields_nothing() {
        assert!(parse_expansion_reply(r#"{"answer": "none"}"#).is_empty());
    }
}
