//! Startup corpus loading.
//!
//! The offline build step leaves three JSON artifacts in the data
//! directory: the cleaned articles, the indexed article ids, and their
//! embedding vectors (ids and vectors in the same order). This module
//! loads them into the immutable [`ArticleStore`] and
//! [`SimilarityIndex`] shared by every request.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use medlit_rag::{ArticleStore, SimilarityIndex};
use tracing::info;

/// Locations of the corpus artifacts.
#[derive(Debug, Clone)]
pub struct CorpusPaths {
    /// The cleaned article metadata (`articles.json`).
    pub articles: PathBuf,
    /// The indexed article ids (`article_ids.json`).
    pub article_ids: PathBuf,
    /// The embedding vectors (`embeddings.json`).
    pub embeddings: PathBuf,
}

impl CorpusPaths {
    /// Conventional artifact names under one data directory.
    pub fn from_dir(dir: &Path) -> Self {
        Self {
            articles: dir.join("articles.json"),
            article_ids: dir.join("article_ids.json"),
            embeddings: dir.join("embeddings.json"),
        }
    }
}

/// Load the corpus and verify index/store consistency.
///
/// Every id the index can return must resolve in the store; failing that
/// at startup is a build fault, and refusing to serve beats aborting
/// requests one by one later.
pub fn load_corpus(paths: &CorpusPaths) -> anyhow::Result<(Arc<SimilarityIndex>, Arc<ArticleStore>)> {
    let store = ArticleStore::load(&paths.articles)
        .with_context(|| format!("loading article store from {}", paths.articles.display()))?;
    let index = SimilarityIndex::load(&paths.article_ids, &paths.embeddings)
        .with_context(|| format!("loading similarity index from {}", paths.article_ids.display()))?;

    let dangling: Vec<&str> = index.pmids().filter(|pmid| store.get(pmid).is_none()).collect();
    if !dangling.is_empty() {
        bail!(
            "index references {} article(s) missing from the store (first: {})",
            dangling.len(),
            dangling[0]
        );
    }

    info!(
        articles = store.len(),
        indexed = index.len(),
        dimensions = index.dimensions(),
        "corpus loaded"
    );
    Ok((Arc::new(index), Arc::new(store)))
}
