//! HTTP server for the medlit semantic search and RAG service.
//!
//! Thin presentation layer over [`medlit_rag::QueryPipeline`]: JSON
//! endpoints for the synchronous variants, SSE endpoints that forward
//! pipeline progress events as they happen, and the corpus loading that
//! builds the immutable index and store at startup.

pub mod corpus;
pub mod server;
pub mod wire;

pub use server::{AppState, ServerConfig, app_router, run_server};
