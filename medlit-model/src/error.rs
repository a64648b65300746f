//! Error types for the `medlit-model` crate.

use thiserror::Error;

/// Errors that can occur when invoking a capability provider.
#[derive(Debug, Error)]
pub enum ModelError {
    /// An error from a chat completion provider.
    #[error("Chat provider error ({provider}): {message}")]
    Chat {
        /// The provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error from an embedding provider.
    #[error("Embedding provider error ({provider}): {message}")]
    Embedding {
        /// The provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A provider configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A convenience result type for provider operations.
pub type Result<T> = std::result::Result<T, ModelError>;
