//! Read-only article store keyed by PubMed id.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use crate::document::Article;
use crate::error::{PipelineError, Result};

/// Maps article ids to full metadata. Loaded once at startup from the
/// cleaned corpus file and never mutated at query time.
#[derive(Debug, Clone, Default)]
pub struct ArticleStore {
    articles: HashMap<String, Article>,
}

impl ArticleStore {
    /// Build a store from a list of articles.
    pub fn new(articles: Vec<Article>) -> Self {
        let articles = articles.into_iter().map(|a| (a.pmid.clone(), a)).collect();
        Self { articles }
    }

    /// Load a store from a JSON array of articles.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Corpus(format!("failed to read {}: {e}", path.display()))
        })?;
        let articles: Vec<Article> = serde_json::from_str(&raw).map_err(|e| {
            PipelineError::Corpus(format!("failed to parse {}: {e}", path.display()))
        })?;
        let store = Self::new(articles);
        info!(articles = store.len(), "loaded article store");
        Ok(store)
    }

    /// Look up an article by id.
    pub fn get(&self, pmid: &str) -> Option<&Article> {
        self.articles.get(pmid)
    }

    /// Number of stored articles.
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    /// Whether the store holds no articles.
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(pmid: &str) -> Article {
        Article {
            pmid: pmid.into(),
            title: format!("title {pmid}"),
            abstract_text: "text".into(),
            authors: vec![],
            journal: String::new(),
            pub_date: String::new(),
            doi: None,
        }
    }

    #[test]
    fn get_resolves_known_ids() {
        let store = ArticleStore::new(vec![article("1"), article("2")]);
        assert_eq!(store.get("2").unwrap().title, "title 2");
        assert!(store.get("3").is_none());
        assert_eq!(store.len(), 2);
    }
}
