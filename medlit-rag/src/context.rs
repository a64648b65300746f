//! Context assembly from retrieved articles.

use tracing::info;

use crate::document::RankedArticle;

/// A generation context plus the articles that actually made it in.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltContext {
    /// The concatenated article blocks fed to the generator.
    pub text: String,
    /// The articles included in `text`, in rank order.
    pub used: Vec<RankedArticle>,
}

/// Assembles a bounded-length textual context from retrieved articles.
///
/// Articles are appended in the given (rank) order. An article whose
/// block would push the context past the budget is dropped entirely, as
/// is everything after it. Higher-ranked articles are always kept
/// whole, and no block is ever truncated mid-article.
#[derive(Debug, Clone, Copy)]
pub struct ContextBuilder {
    max_chars: usize,
}

impl ContextBuilder {
    /// Create a builder with the given character budget.
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Format one article as a context block.
    fn article_block(article: &RankedArticle) -> String {
        format!(
            "PMID: {}\nTitle: {}\nJournal: {}\nPublication Date: {}\nAbstract: {}\nAuthors: {}\n{}\n",
            article.pmid,
            article.title,
            article.journal,
            article.pub_date,
            article.abstract_text,
            article.authors.join(", "),
            "-".repeat(50),
        )
    }

    /// Build the context from articles in rank order.
    pub fn build(&self, articles: &[RankedArticle]) -> BuiltContext {
        let mut parts: Vec<String> = Vec::new();
        let mut used: Vec<RankedArticle> = Vec::new();
        let mut current_length = 0usize;

        for article in articles {
            let block = Self::article_block(article);
            if current_length + block.len() > self.max_chars {
                break;
            }
            current_length += block.len();
            parts.push(block);
            used.push(article.clone());
        }

        info!(
            used = used.len(),
            retrieved = articles.len(),
            context_chars = current_length,
            "assembled generation context"
        );

        BuiltContext { text: parts.join("\n"), used }
    }
}
