//! The query pipeline orchestrator.
//!
//! [`QueryPipeline`] composes the detector, translator, expander,
//! embedding provider, similarity index, article store, context builder,
//! and answer generator into the two request flows:
//!
//! - **Search**: detect → translate (conditionally) → embed → search →
//!   retrieve.
//! - **RAG-QA**: the same through retrieval, then context assembly and
//!   answer generation, with optional query expansion before embedding.
//!
//! Construct one via [`QueryPipeline::builder()`] at process start and
//! share it behind an `Arc`; requests run concurrently against the
//! immutable index and store with no shared mutable state.

use std::sync::Arc;

use medlit_model::{ChatModel, EmbeddingProvider, ModelError};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::answer::AnswerGenerator;
use crate::config::PipelineConfig;
use crate::context::ContextBuilder;
use crate::document::{RankedArticle, ScoredMatch};
use crate::error::{PipelineError, Result};
use crate::expand::QueryExpander;
use crate::index::SimilarityIndex;
use crate::language::{Detection, LanguageDetector};
use crate::progress::{Flow, PipelineEvent, ProgressEmitter, Stage, TranslationDetail};
use crate::store::ArticleStore;
use crate::translate::{TranslationOutcome, Translator};

/// A search request: ranked document retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// The free-text query, possibly mixed-language.
    pub query: String,
    /// Requested result count; the configured default when absent.
    pub top_k: Option<usize>,
}

/// A RAG question-answering request.
#[derive(Debug, Clone, PartialEq)]
pub struct QaRequest {
    /// The free-text question, possibly mixed-language.
    pub question: String,
    /// Requested retrieval count; the configured default when absent.
    pub top_k: Option<usize>,
}

/// Terminal payload of the search flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    /// The query as submitted.
    pub original_query: String,
    /// The English query used for embedding.
    pub translated_query: String,
    /// Ranked results, best first.
    pub results: Vec<RankedArticle>,
}

/// Terminal payload of the RAG flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagOutcome {
    /// The question as submitted.
    pub original_question: String,
    /// The English question used for retrieval.
    pub translated_question: String,
    /// The generated answer.
    pub answer: String,
    /// The articles the generator actually saw, in rank order. Citations
    /// in `answer` resolve against this list.
    pub relevant_articles: Vec<RankedArticle>,
    /// Number of articles in `relevant_articles`.
    pub articles_used: usize,
}

/// The query pipeline orchestrator. See the module docs for the flows.
pub struct QueryPipeline {
    config: PipelineConfig,
    detector: LanguageDetector,
    translator: Translator,
    expander: QueryExpander,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<SimilarityIndex>,
    store: Arc<ArticleStore>,
    context_builder: ContextBuilder,
    generator: AnswerGenerator,
}

impl QueryPipeline {
    /// Create a new [`QueryPipelineBuilder`].
    pub fn builder() -> QueryPipelineBuilder {
        QueryPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Number of articles in the store.
    pub fn article_count(&self) -> usize {
        self.store.len()
    }

    /// Number of vectors in the similarity index.
    pub fn index_size(&self) -> usize {
        self.index.len()
    }

    /// Run language detection without the rest of the pipeline.
    pub fn detect(&self, text: &str) -> Detection {
        self.detector.detect(text)
    }

    /// Translate directly, bypassing the retrieval stages. Backs the
    /// standalone translation endpoint.
    pub async fn translate_direct(&self, text: &str) -> Result<TranslationOutcome> {
        if self.detector.detect(text).needs_translation {
            self.translator.translate(text).await
        } else {
            Ok(TranslationOutcome::passthrough(text))
        }
    }

    // ── validation ─────────────────────────────────────────────────

    fn validate_text(&self, text: &str, what: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(PipelineError::InvalidInput(format!("{what} is required")));
        }
        let chars = text.chars().count();
        if chars > self.config.max_query_chars {
            return Err(PipelineError::InvalidInput(format!(
                "{what} exceeds the maximum length of {} characters",
                self.config.max_query_chars
            )));
        }
        Ok(())
    }

    fn validate_top_k(&self, top_k: Option<usize>) -> Result<()> {
        if let Some(k) = top_k {
            if k == 0 || k > self.config.max_top_k {
                return Err(PipelineError::InvalidInput(format!(
                    "top_k must be between 1 and {}",
                    self.config.max_top_k
                )));
            }
        }
        Ok(())
    }

    /// Validate a search request without running it. Streaming handlers
    /// call this before opening the event stream so validation failures
    /// stay synchronous.
    pub fn validate_search(&self, request: &SearchRequest) -> Result<()> {
        self.validate_text(&request.query, "Query")?;
        self.validate_top_k(request.top_k)
    }

    /// Validate a RAG request without running it.
    pub fn validate_qa(&self, request: &QaRequest) -> Result<()> {
        self.validate_text(&request.question, "Question")?;
        self.validate_top_k(request.top_k)
    }

    // ── flows ──────────────────────────────────────────────────────

    /// Run the search flow without progress events.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        self.validate_search(request)?;
        let mut emitter = ProgressEmitter::disabled(Flow::Search);
        self.run_search(request, &mut emitter).await
    }

    /// Run the RAG flow without progress events.
    pub async fn answer(&self, request: &QaRequest) -> Result<RagOutcome> {
        self.validate_qa(request)?;
        let mut emitter = ProgressEmitter::disabled(Flow::RagQa);
        self.run_qa(request, &mut emitter).await
    }

    /// Run the search flow, delivering progress and the terminal event
    /// into `tx`. The request must already be validated; a validation
    /// failure here still surfaces as a terminal error event rather than
    /// a panic.
    pub async fn search_streaming(
        &self,
        request: SearchRequest,
        tx: mpsc::Sender<PipelineEvent>,
    ) {
        let mut emitter = ProgressEmitter::streaming(Flow::Search, tx);
        let result = match self.validate_search(&request) {
            Ok(()) => self.run_search(&request, &mut emitter).await,
            Err(e) => Err(e),
        };
        Self::finish(emitter, result.map(PipelineEvent::SearchComplete)).await;
    }

    /// Run the RAG flow, delivering progress and the terminal event into `tx`.
    pub async fn answer_streaming(&self, request: QaRequest, tx: mpsc::Sender<PipelineEvent>) {
        let mut emitter = ProgressEmitter::streaming(Flow::RagQa, tx);
        let result = match self.validate_qa(&request) {
            Ok(()) => self.run_qa(&request, &mut emitter).await,
            Err(e) => Err(e),
        };
        Self::finish(emitter, result.map(PipelineEvent::RagComplete)).await;
    }

    async fn finish(emitter: ProgressEmitter, result: Result<PipelineEvent>) {
        match result {
            Ok(event) => emitter.finish(event).await,
            Err(PipelineError::ClientGone) => {
                // Nobody is listening; discard the in-flight work.
                debug!("client disconnected mid-pipeline");
            }
            Err(e) => emitter.finish(PipelineEvent::Failed { message: e.user_message() }).await,
        }
    }

    /// Shared front of both flows: detect, then translate or pass through.
    async fn detect_and_translate(
        &self,
        text: &str,
        emitter: &mut ProgressEmitter,
    ) -> Result<TranslationOutcome> {
        emitter.stage(Stage::Detect).await?;
        let detection = self.detector.detect(text);

        if !detection.needs_translation {
            emitter.stage(Stage::TranslateSkipped).await?;
            return Ok(TranslationOutcome::passthrough(text));
        }

        info!(
            non_target_fraction = detection.non_target_fraction,
            "query contains non-English characters"
        );
        emitter
            .translation_stage(
                Stage::TranslateStarted,
                TranslationDetail::Original(text.to_string()),
            )
            .await?;
        let outcome = self.translator.translate(text).await?;
        emitter
            .translation_stage(
                Stage::TranslateCompleted,
                TranslationDetail::Translated(outcome.translated.clone()),
            )
            .await?;
        Ok(outcome)
    }

    /// Resolve index matches against the store, preserving rank order.
    fn resolve_matches(&self, matches: &[ScoredMatch]) -> Result<Vec<RankedArticle>> {
        matches
            .iter()
            .map(|matched| {
                self.store
                    .get(&matched.pmid)
                    .map(|article| RankedArticle::from_match(article, matched))
                    .ok_or_else(|| {
                        error!(pmid = %matched.pmid, "index returned an id missing from the store");
                        PipelineError::Consistency(format!(
                            "article '{}' present in index but missing from store",
                            matched.pmid
                        ))
                    })
            })
            .collect()
    }

    async fn run_search(
        &self,
        request: &SearchRequest,
        emitter: &mut ProgressEmitter,
    ) -> Result<SearchOutcome> {
        let top_k = request.top_k.unwrap_or(self.config.search_top_k);
        let translation = self.detect_and_translate(&request.query, emitter).await?;

        emitter.stage(Stage::Embed).await?;
        let vector = self.embedder.embed(&translation.translated).await?;

        emitter.stage(Stage::Search).await?;
        let matches = self.index.search(&vector, top_k);

        emitter.stage(Stage::Retrieve).await?;
        let results = self.resolve_matches(&matches)?;

        emitter.stage(Stage::Complete).await?;
        info!(results = results.len(), top_k, "search completed");

        Ok(SearchOutcome {
            original_query: translation.original,
            translated_query: translation.translated,
            results,
        })
    }

    async fn run_qa(
        &self,
        request: &QaRequest,
        emitter: &mut ProgressEmitter,
    ) -> Result<RagOutcome> {
        let top_k = request.top_k.unwrap_or(self.config.rag_top_k);
        let translation = self.detect_and_translate(&request.question, emitter).await?;

        let mut queries = vec![translation.translated.clone()];
        if self.config.expand_queries {
            emitter.stage(Stage::Expand).await?;
            queries.extend(self.expander.expand(&translation.translated).await);
        }

        emitter.stage(Stage::Embed).await?;
        let texts: Vec<&str> = queries.iter().map(String::as_str).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        let vector = mean_vector(&embeddings, queries.len())?;

        emitter.stage(Stage::Search).await?;
        let matches = self.index.search(&vector, top_k);

        emitter.stage(Stage::Retrieve).await?;
        let retrieved = self.resolve_matches(&matches)?;

        emitter.stage(Stage::Context).await?;
        let built = self.context_builder.build(&retrieved);

        emitter.stage(Stage::Generate).await?;
        let answer = self
            .generator
            .generate(
                &translation.translated,
                &translation.original,
                &translation.source_language,
                &built.text,
                &built.used,
            )
            .await?;

        emitter.stage(Stage::Complete).await?;
        info!(
            retrieved = retrieved.len(),
            articles_used = built.used.len(),
            "RAG question answered"
        );

        Ok(RagOutcome {
            original_question: translation.original,
            translated_question: translation.translated,
            answer,
            articles_used: built.used.len(),
            relevant_articles: built.used,
        })
    }
}

/// Average a batch of embeddings into a single query vector.
///
/// The batch must contain one embedding per input text, all of the same
/// dimension; anything else is malformed provider output.
fn mean_vector(embeddings: &[Vec<f32>], expected: usize) -> Result<Vec<f32>> {
    if embeddings.len() != expected {
        return Err(PipelineError::Provider(ModelError::Embedding {
            provider: "embedding".into(),
            message: format!(
                "provider returned {} embeddings for {} inputs",
                embeddings.len(),
                expected
            ),
        }));
    }
    let dimensions = embeddings[0].len();
    if embeddings.iter().any(|e| e.len() != dimensions) {
        return Err(PipelineError::Provider(ModelError::Embedding {
            provider: "embedding".into(),
            message: "provider returned embeddings of mixed dimensionality".into(),
        }));
    }

    let mut mean = vec![0.0f32; dimensions];
    for embedding in embeddings {
        for (accumulator, value) in mean.iter_mut().zip(embedding) {
            *accumulator += value;
        }
    }
    let count = embeddings.len() as f32;
    for value in &mut mean {
        *value /= count;
    }
    Ok(mean)
}

/// Builder for constructing a [`QueryPipeline`].
///
/// All fields except `config` are required; `config` falls back to
/// [`PipelineConfig::default()`].
#[derive(Default)]
pub struct QueryPipelineBuilder {
    config: Option<PipelineConfig>,
    chat_model: Option<Arc<dyn ChatModel>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    index: Option<Arc<SimilarityIndex>>,
    store: Option<Arc<ArticleStore>>,
}

impl QueryPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the chat model used for translation, expansion, and generation.
    pub fn chat_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.chat_model = Some(model);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the similarity index.
    pub fn index(mut self, index: Arc<SimilarityIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the article store.
    pub fn store(mut self, store: Arc<ArticleStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the [`QueryPipeline`], validating that all required
    /// components are present.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if a required component is
    /// missing.
    pub fn build(self) -> Result<QueryPipeline> {
        let config = self.config.unwrap_or_default();
        let chat_model = self
            .chat_model
            .ok_or_else(|| PipelineError::Config("chat_model is required".into()))?;
        let embedder = self
            .embedding_provider
            .ok_or_else(|| PipelineError::Config("embedding_provider is required".into()))?;
        let index =
            self.index.ok_or_else(|| PipelineError::Config("index is required".into()))?;
        let store =
            self.store.ok_or_else(|| PipelineError::Config("store is required".into()))?;

        Ok(QueryPipeline {
            detector: LanguageDetector::new(config.detection_threshold),
            translator: Translator::new(chat_model.clone()),
            expander: QueryExpander::new(chat_model.clone()),
            context_builder: ContextBuilder::new(config.max_context_chars),
            generator: AnswerGenerator::new(chat_model, config.relevance_threshold),
            embedder,
            index,
            store,
            config,
        })
    }
}
