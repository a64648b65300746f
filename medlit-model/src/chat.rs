//! Chat model trait for single-shot text generation.

use async_trait::async_trait;

use crate::error::Result;

/// A single-shot chat completion request.
///
/// The pipeline never holds multi-turn conversations: every call is one
/// system frame plus one user message, and the provider's reply text is
/// the whole result.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// The system instruction frame.
    pub system: String,
    /// The user message.
    pub user: String,
    /// Maximum number of tokens the provider may generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// When true, the provider is asked to return a single JSON object.
    pub json_output: bool,
}

impl ChatRequest {
    /// Create a request with the given system frame and user message.
    ///
    /// Defaults: 1500 max tokens, temperature 0.2, plain-text output.
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 1500,
            temperature: 0.2,
            json_output: false,
        }
    }

    /// Set the maximum number of generated tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Ask the provider for a single JSON object as output.
    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// A provider that produces one completion for one request.
///
/// Implementations wrap specific chat backends behind a unified async
/// interface. There is no streaming and no retry at this layer; a failed
/// call surfaces as a [`ModelError`](crate::ModelError) and the caller
/// decides what that means for the request.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a completion and return the assistant message text.
    async fn complete(&self, request: ChatRequest) -> Result<String>;

    /// Return the model name, for logging and the stats endpoint.
    fn name(&self) -> &str;
}
