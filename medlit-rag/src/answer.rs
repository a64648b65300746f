//! Answer generation for the RAG flow.

use std::sync::Arc;

use medlit_model::{ChatModel, ChatRequest};
use tracing::{error, info};

use crate::document::RankedArticle;
use crate::error::{PipelineError, Result};

const ANSWER_SYSTEM: &str = "You are a medical research assistant. You help with PubMed \
     literature research by answering questions based *only* on the provided literature. \
     You must adhere to the user's instructions, especially regarding citation format.";

/// How the relevance gate classified the retrieved articles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelevanceGate {
    /// No usable articles; answer without invoking the provider.
    NoLiterature,
    /// Articles exist but the best match is weak and there are few of them.
    LowRelevance,
    /// Few articles, but with acceptable similarity.
    LimitedArticles,
    /// Enough relevant articles for a normal generated answer.
    Normal,
}

/// Produces the natural-language answer for a RAG request.
///
/// Before invoking the provider, a relevance gate checks the articles
/// that made it into the context: with no articles, or only weak
/// matches, the generator returns an explicit canned response instead of
/// asking the model to answer from nothing. The normal path is a single
/// provider call with an instruction frame that restricts the model to
/// the supplied literature and requires PMID citations, so answer text
/// can be cross-linked to the reported articles.
pub struct AnswerGenerator {
    model: Arc<dyn ChatModel>,
    relevance_threshold: f32,
}

impl AnswerGenerator {
    /// Create a generator over the given chat model.
    ///
    /// `relevance_threshold` is the best-match similarity below which
    /// retrieved articles are considered weak.
    pub fn new(model: Arc<dyn ChatModel>, relevance_threshold: f32) -> Self {
        Self { model, relevance_threshold }
    }

    fn classify(&self, articles: &[RankedArticle]) -> RelevanceGate {
        if articles.is_empty() {
            return RelevanceGate::NoLiterature;
        }
        let max_similarity =
            articles.iter().map(|a| a.similarity_score).fold(f32::MIN, f32::max);
        if max_similarity < self.relevance_threshold {
            if articles.len() <= 3 {
                RelevanceGate::NoLiterature
            } else {
                RelevanceGate::LowRelevance
            }
        } else if articles.len() <= 3 {
            RelevanceGate::LimitedArticles
        } else {
            RelevanceGate::Normal
        }
    }

    /// Generate an answer from the assembled context.
    ///
    /// `question` is the (translated) English question used for
    /// retrieval; `original_question` and `source_language` control the
    /// language of the reply. `articles` is the set actually included in
    /// `context`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Provider`] if the provider call fails.
    /// The canned low-relevance paths never invoke the provider and
    /// cannot fail.
    pub async fn generate(
        &self,
        question: &str,
        original_question: &str,
        source_language: &str,
        context: &str,
        articles: &[RankedArticle],
    ) -> Result<String> {
        match self.classify(articles) {
            RelevanceGate::NoLiterature => {
                info!("no relevant literature, answering without provider call");
                Ok(no_literature_response(original_question))
            }
            RelevanceGate::LowRelevance => {
                let max_similarity =
                    articles.iter().map(|a| a.similarity_score).fold(f32::MIN, f32::max);
                info!(max_similarity, "low relevance, answering without provider call");
                Ok(low_relevance_response(original_question, max_similarity, articles.len()))
            }
            RelevanceGate::LimitedArticles => {
                // Few but relevant articles: still answer from them, with
                // the limitation stated up front.
                let answer =
                    self.generate_normal(question, original_question, source_language, context)
                        .await?;
                Ok(format!(
                    "Note: only {} relevant articles were found, so the answer below may \
                     not be comprehensive.\n\n{answer}",
                    articles.len()
                ))
            }
            RelevanceGate::Normal => {
                self.generate_normal(question, original_question, source_language, context).await
            }
        }
    }

    async fn generate_normal(
        &self,
        question: &str,
        original_question: &str,
        source_language: &str,
        context: &str,
    ) -> Result<String> {
        let language_instruction = match source_language {
            "Traditional Chinese" => "The user asked in Traditional Chinese. Your entire \
                 response MUST be in Traditional Chinese (繁體中文)."
                .to_string(),
            "Simplified Chinese" => "The user asked in Simplified Chinese. Your entire \
                 response MUST be in Simplified Chinese (简体中文)."
                .to_string(),
            other => format!(
                "Answer in the same language as the original user question ({other})."
            ),
        };

        let prompt = format!(
            "You are a medical research assistant specialized in helping with PubMed \
             medical literature research.\n\n\
             YOUR ROLE AND CAPABILITIES:\n\
             - You can answer questions about medical research, healthcare systems, \
             diseases, treatments, and health policy based on PubMed literature.\n\
             - You CANNOT provide personal medical advice, diagnosis, or treatment \
             recommendations.\n\n\
             Question: {original_question}\n\n\
             Relevant Medical Literature:\n{context}\n\n\
             Instructions:\n\
             1. Answer based *only* on the provided \"Relevant Medical Literature\". \
             Do not use outside knowledge.\n\
             2. Provide a comprehensive answer that includes key findings, \
             methodologies, and conclusions from the literature.\n\
             3. When citing studies, use proper APA format: (First Author et al., \
             Year; PMID: XXXX).\n\
             4. Extract the year from the publication date for citations.\n\
             5. If the literature does not contain enough information to answer the \
             question ({question}), clearly state this limitation.\n\
             6. {language_instruction}\n\
             7. Structure your answer logically with clear sections if appropriate.\n\n\
             Answer:"
        );

        let request = ChatRequest::new(ANSWER_SYSTEM, prompt)
            .with_max_tokens(1500)
            .with_temperature(0.2);

        self.model.complete(request).await.map_err(|e| {
            error!(error = %e, "answer generation failed");
            PipelineError::Provider(e)
        })
    }
}

/// Canned answer when the corpus holds nothing relevant to the question.
fn no_literature_response(original_question: &str) -> String {
    format!(
        "I cannot find any literature directly relevant to your question \
         \"{original_question}\" in the current medical literature database.\n\n\
         **Possible reasons:**\n\
         - Your question may involve a newer research area\n\
         - The database may lack literature on this specific topic\n\
         - Query terms may need adjustment\n\n\
         **Suggestions:**\n\
         - Try rephrasing your question with different keywords\n\
         - Consider asking about related but broader concepts"
    )
}

/// Canned answer when articles exist but none is a strong match.
fn low_relevance_response(
    original_question: &str,
    max_similarity: f32,
    article_count: usize,
) -> String {
    format!(
        "I found {article_count} articles in the database, but none have high relevance \
         to your question \"{original_question}\". The most relevant article has only \
         {:.1}% similarity.\n\n\
         **Suggestions:**\n\
         - Try using different keywords or broader terms\n\
         - Consider asking about related topics\n\
         - The available literature may not address your specific question",
        max_similarity * 100.0
    )
}
