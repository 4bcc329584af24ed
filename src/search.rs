//! Query expansion and relevance ranking.
//!
//! Searching is synchronous: it runs over sessions already in memory and its output is
//! capped, so a search finishes well within a frame budget.

pub mod expand;
pub mod fold;
pub mod scorer;
pub mod snippet;
pub mod synonyms;

pub use expand::{expand, ExpandedQuery, QueryExpander};
pub use scorer::{MatchTier, RelevanceScorer, SearchMatch, SearchResults};
pub use snippet::{Snippet, SnippetWindow};
pub use synonyms::SynonymTable;

use crate::config::SearchConfig;
use crate::store::SessionStore;

/// Expander and scorer configured together.
#[derive(Debug)]
pub struct SearchEngine {
    expander: QueryExpander,
    scorer: RelevanceScorer,
}

impl SearchEngine {
    pub fn new(config: SearchConfig) -> Self {
        let synonyms = SynonymTable::with_overrides(&config.synonyms);
        Self {
            expander: QueryExpander::new(synonyms),
            scorer: RelevanceScorer::new(config),
        }
    }

    pub fn with_parts(expander: QueryExpander, scorer: RelevanceScorer) -> Self {
        Self { expander, scorer }
    }

    pub fn expander(&self) -> &QueryExpander {
        &self.expander
    }

    pub fn search(&self, query: &str, store: &SessionStore) -> SearchResults {
        let expanded = self.expander.expand(query);
        self.scorer.score(&expanded, store)
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}
