//! Capability providers for the medlit literature search service.
//!
//! This crate defines the two provider seams the query pipeline depends
//! on: [`ChatModel`] for translation and answer generation, and
//! [`EmbeddingProvider`] for query vectors. It also ships
//! OpenAI-compatible HTTP implementations of both. Providers are opaque
//! capabilities; the pipeline only sees the trait contracts.

pub mod chat;
pub mod embedding;
pub mod error;
pub mod openai;

pub use chat::{ChatModel, ChatRequest};
pub use embedding::EmbeddingProvider;
pub use error::{ModelError, Result};
pub use openai::{OpenAiChatModel, OpenAiEmbeddingProvider};
