//! Immutable similarity index over precomputed article vectors.
//!
//! The index is the serving-time counterpart of the offline embedding
//! build: parallel arrays of article ids and their vectors, searched by
//! brute-force cosine similarity. It is constructed once at startup and
//! shared read-only across requests; concurrent searches need no locking.

use std::path::Path;

use tracing::info;

use crate::document::ScoredMatch;
use crate::error::{PipelineError, Result};

/// A read-only nearest-neighbor index over article embedding vectors.
///
/// Ordering is strictly descending by cosine similarity; equal scores
/// keep insertion order (the sort is stable). Ranks are assigned as the
/// contiguous sequence `1..=len` of the returned set.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    pmids: Vec<String>,
    vectors: Vec<Vec<f32>>,
    dimensions: usize,
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

impl SimilarityIndex {
    /// Build an index from parallel id and vector arrays.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Corpus`] if the arrays differ in length
    /// or the vectors are not all of the same non-zero dimension.
    pub fn new(pmids: Vec<String>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if pmids.len() != vectors.len() {
            return Err(PipelineError::Corpus(format!(
                "id/vector count mismatch: {} ids, {} vectors",
                pmids.len(),
                vectors.len()
            )));
        }
        let dimensions = vectors.first().map(Vec::len).unwrap_or(0);
        if vectors.is_empty() {
            return Ok(Self { pmids, vectors, dimensions });
        }
        if dimensions == 0 {
            return Err(PipelineError::Corpus("vectors must be non-empty".into()));
        }
        if let Some(bad) = vectors.iter().position(|v| v.len() != dimensions) {
            return Err(PipelineError::Corpus(format!(
                "vector {} has dimension {}, expected {}",
                bad,
                vectors[bad].len(),
                dimensions
            )));
        }
        Ok(Self { pmids, vectors, dimensions })
    }

    /// Load an index from the offline build artifacts: a JSON array of
    /// article ids and a JSON array of embedding vectors, in the same
    /// order.
    pub fn load(ids_path: &Path, vectors_path: &Path) -> Result<Self> {
        let ids_raw = std::fs::read_to_string(ids_path).map_err(|e| {
            PipelineError::Corpus(format!("failed to read {}: {e}", ids_path.display()))
        })?;
        let pmids: Vec<String> = serde_json::from_str(&ids_raw).map_err(|e| {
            PipelineError::Corpus(format!("failed to parse {}: {e}", ids_path.display()))
        })?;

        let vectors_raw = std::fs::read_to_string(vectors_path).map_err(|e| {
            PipelineError::Corpus(format!("failed to read {}: {e}", vectors_path.display()))
        })?;
        let vectors: Vec<Vec<f32>> = serde_json::from_str(&vectors_raw).map_err(|e| {
            PipelineError::Corpus(format!("failed to parse {}: {e}", vectors_path.display()))
        })?;

        let index = Self::new(pmids, vectors)?;
        info!(articles = index.len(), dimensions = index.dimensions, "loaded similarity index");
        Ok(index)
    }

    /// Number of indexed articles.
    pub fn len(&self) -> usize {
        self.pmids.len()
    }

    /// Whether the index holds no articles.
    pub fn is_empty(&self) -> bool {
        self.pmids.is_empty()
    }

    /// Dimensionality of the indexed vectors (0 for an empty index).
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Iterate over the indexed article ids, in insertion order.
    pub fn pmids(&self) -> impl Iterator<Item = &str> {
        self.pmids.iter().map(String::as_str)
    }

    /// Return the `top_k` most similar articles to the query vector.
    ///
    /// Returns at most `min(top_k, len)` matches in strictly descending
    /// score order, ranks `1..=count`. `top_k` must be positive; the
    /// pipeline validates it before any stage runs.
    pub fn search(&self, query: &[f32], top_k: usize) -> Vec<ScoredMatch> {
        debug_assert!(top_k > 0, "top_k validated upstream");

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(v, query)))
            .collect();

        // Stable sort keeps insertion order for tied scores.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        scored
            .into_iter()
            .enumerate()
            .map(|(i, (idx, score))| ScoredMatch {
                pmid: self.pmids[idx].clone(),
                score,
                rank: i + 1,
            })
            .collect()
    }
}
