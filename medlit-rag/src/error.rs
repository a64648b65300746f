//! Error types for the `medlit-rag` crate.

use thiserror::Error;

/// Errors that can occur while executing the query pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request failed validation before any stage ran.
    #[error("{0}")]
    InvalidInput(String),

    /// A capability provider (translation, embedding, generation) failed
    /// or timed out. Terminal for the request; never retried here.
    #[error(transparent)]
    Provider(#[from] medlit_model::ModelError),

    /// The similarity index returned an article id the store cannot
    /// resolve. An index/store build fault, not a user error.
    #[error("index/store inconsistency: {0}")]
    Consistency(String),

    /// The client disconnected; the event channel is closed.
    #[error("client disconnected")]
    ClientGone,

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A corpus file could not be read or parsed.
    #[error("Corpus error: {0}")]
    Corpus(String),
}

impl PipelineError {
    /// The message shown to the client.
    ///
    /// Consistency faults are corpus-internal; the client gets a generic
    /// description while the detail goes to the log at the raise site.
    pub fn user_message(&self) -> String {
        match self {
            Self::Consistency(_) => {
                "Internal error while assembling results. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// A convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
