//! Data types for articles and search results.

use serde::{Deserialize, Serialize};

/// A corpus entry: one biomedical literature abstract with its metadata.
///
/// Articles are produced by the offline ingestion step and never mutated
/// at query time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    /// Stable unique identifier (PubMed ID).
    pub pmid: String,
    /// The article title.
    pub title: String,
    /// The abstract text.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Author names in publication order.
    #[serde(default)]
    pub authors: Vec<String>,
    /// The journal name.
    #[serde(default)]
    pub journal: String,
    /// Publication date as recorded by the source.
    #[serde(default)]
    pub pub_date: String,
    /// Digital object identifier, when the source provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
}

/// One similarity-search hit: an article id with its score and rank.
///
/// Ranks are 1-based positions in descending-score order; within one
/// result set they form a contiguous permutation of `1..=len`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredMatch {
    /// The matched article's id.
    pub pmid: String,
    /// Similarity score, higher is more similar.
    pub score: f32,
    /// 1-based rank within the result set.
    pub rank: usize,
}

/// A fully resolved search result: article metadata plus score and rank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedArticle {
    /// 1-based rank within the result set.
    pub rank: usize,
    /// Stable unique identifier (PubMed ID).
    pub pmid: String,
    /// The article title.
    pub title: String,
    /// The abstract text.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// The journal name.
    pub journal: String,
    /// Publication date as recorded by the source.
    pub pub_date: String,
    /// Author names in publication order.
    pub authors: Vec<String>,
    /// Similarity score from the index, higher is more similar.
    pub similarity_score: f32,
}

impl RankedArticle {
    /// Combine an article with its similarity match.
    pub fn from_match(article: &Article, matched: &ScoredMatch) -> Self {
        Self {
            rank: matched.rank,
            pmid: article.pmid.clone(),
            title: article.title.clone(),
            abstract_text: article.abstract_text.clone(),
            journal: article.journal.clone(),
            pub_date: article.pub_date.clone(),
            authors: article.authors.clone(),
            similarity_score: matched.score,
        }
    }
}
