//! Configuration for the query pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Configuration parameters for the query pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Default number of results for the search flow.
    pub search_top_k: usize,
    /// Default number of retrieved articles for the RAG flow.
    pub rag_top_k: usize,
    /// Upper bound on any requested `top_k`.
    pub max_top_k: usize,
    /// Upper bound on query/question length, in characters.
    pub max_query_chars: usize,
    /// Character budget for the generation context.
    pub max_context_chars: usize,
    /// Below this best-match similarity the RAG flow answers with a
    /// canned low-relevance response instead of calling the generator.
    pub relevance_threshold: f32,
    /// Fraction of non-target-alphabet characters (among non-whitespace)
    /// above which a query is translated. 0.0 means any single
    /// non-target character triggers translation.
    pub detection_threshold: f64,
    /// Whether the RAG flow expands the question into related search
    /// terms before embedding.
    pub expand_queries: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            search_top_k: 10,
            rag_top_k: 20,
            max_top_k: 50,
            max_query_chars: 512,
            max_context_chars: 12_000,
            relevance_threshold: 0.3,
            detection_threshold: 0.0,
            expand_queries: true,
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for constructing a [`PipelineConfig`].
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`PipelineConfig`].
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the default result count for the search flow.
    pub fn search_top_k(mut self, k: usize) -> Self {
        self.config.search_top_k = k;
        self
    }

    /// Set the default retrieved-article count for the RAG flow.
    pub fn rag_top_k(mut self, k: usize) -> Self {
        self.config.rag_top_k = k;
        self
    }

    /// Set the upper bound on any requested `top_k`.
    pub fn max_top_k(mut self, k: usize) -> Self {
        self.config.max_top_k = k;
        self
    }

    /// Set the maximum query/question length in characters.
    pub fn max_query_chars(mut self, chars: usize) -> Self {
        self.config.max_query_chars = chars;
        self
    }

    /// Set the character budget for the generation context.
    pub fn max_context_chars(mut self, chars: usize) -> Self {
        self.config.max_context_chars = chars;
        self
    }

    /// Set the best-match similarity below which the RAG flow returns a
    /// canned low-relevance answer.
    pub fn relevance_threshold(mut self, threshold: f32) -> Self {
        self.config.relevance_threshold = threshold;
        self
    }

    /// Set the non-target character fraction that triggers translation.
    pub fn detection_threshold(mut self, threshold: f64) -> Self {
        self.config.detection_threshold = threshold;
        self
    }

    /// Enable or disable query expansion in the RAG flow.
    pub fn expand_queries(mut self, expand: bool) -> Self {
        self.config.expand_queries = expand;
        self
    }

    /// Build the [`PipelineConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if:
    /// - any `top_k` value is zero
    /// - a default `top_k` exceeds `max_top_k`
    /// - `max_query_chars` or `max_context_chars` is zero
    /// - `detection_threshold` is not within `0.0..1.0`
    pub fn build(self) -> Result<PipelineConfig> {
        let config = self.config;
        if config.search_top_k == 0 || config.rag_top_k == 0 || config.max_top_k == 0 {
            return Err(PipelineError::Config("top_k values must be greater than zero".into()));
        }
        if config.search_top_k > config.max_top_k || config.rag_top_k > config.max_top_k {
            return Err(PipelineError::Config(format!(
                "default top_k ({}/{}) must not exceed max_top_k ({})",
                config.search_top_k, config.rag_top_k, config.max_top_k
            )));
        }
        if config.max_query_chars == 0 {
            return Err(PipelineError::Config("max_query_chars must be greater than zero".into()));
        }
        if config.max_context_chars == 0 {
            return Err(PipelineError::Config(
                "max_context_chars must be greater than zero".into(),
            ));
        }
        if !(0.0..1.0).contains(&config.detection_threshold) {
            return Err(PipelineError::Config(format!(
                "detection_threshold ({}) must be within [0.0, 1.0)",
                config.detection_threshold
            )));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::PipelineConfig;

    #[test]
    fn defaults_validate() {
        assert!(PipelineConfig::builder().build().is_ok());
    }

    #[test]
    fn zero_top_k_is_rejected() {
        assert!(PipelineConfig::builder().search_top_k(0).build().is_err());
    }

    #[test]
    fn default_top_k_above_max_is_rejected() {
        assert!(PipelineConfig::builder().rag_top_k(100).max_top_k(50).build().is_err());
    }

    #[test]
    fn out_of_range_detection_threshold_is_rejected() {
        assert!(PipelineConfig::builder().detection_threshold(1.0).build().is_err());
    }
}
