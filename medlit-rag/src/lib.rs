//! Query pipeline for semantic search and retrieval-augmented question
//! answering over a fixed corpus of biomedical literature abstracts.
//!
//! The crate composes a handful of small services (language detection,
//! translation, query embedding, vector similarity search, article
//! retrieval, context assembly, answer generation) into the two
//! request flows served by `medlit-server`:
//!
//! - **Search**: detect → translate (conditionally) → embed → search →
//!   retrieve, producing ranked articles.
//! - **RAG-QA**: the same through retrieval, then context building and
//!   answer generation.
//!
//! Both flows report stage transitions through a [`ProgressEmitter`] so
//! a streaming transport can forward them to the client as they happen.
//! The corpus index and article store are built once at startup and
//! shared immutably across requests.

pub mod answer;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod expand;
pub mod index;
pub mod language;
pub mod pipeline;
pub mod progress;
pub mod store;
pub mod translate;

pub use answer::AnswerGenerator;
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use context::{BuiltContext, ContextBuilder};
pub use document::{Article, RankedArticle, ScoredMatch};
pub use error::{PipelineError, Result};
pub use expand::QueryExpander;
pub use index::SimilarityIndex;
pub use language::{Detection, LanguageDetector};
pub use pipeline::{
    QaRequest, QueryPipeline, QueryPipelineBuilder, RagOutcome, SearchOutcome, SearchRequest,
};
pub use progress::{Flow, PipelineEvent, ProgressEmitter, Stage, StageEvent, TranslationDetail};
pub use store::ArticleStore;
pub use translate::{TranslationOutcome, Translator};
