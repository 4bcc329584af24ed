//! Summary statistics derived from a session's blocks.

use crate::model::{Block, BlockContent, Role};
use std::collections::{BTreeMap, HashMap};

const TOP_KEYWORDS: usize = 8;
const TOP_TOOLS: usize = 5;
const MIN_KEYWORD_LEN: usize = 4;

const STOPWORDS: &[&str] = &[
    "this", "that", "with", "from", "have", "will", "would", "should", "could", "there", "their",
    "about", "which", "when", "what", "where", "then", "than", "them", "they", "into", "your",
    "just", "like", "also", "here", "been", "were", "some", "more", "only", "each", "other",
    "does", "make", "need", "want", "file", "true", "false", "null", "none", "self", "line",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionInsights {
    pub role_counts: BTreeMap<Role, usize>,
    /// Tool name to invocation count, most used first.
    pub top_tools: Vec<(String, usize)>,
    pub tool_invocations: usize,
    /// Languages seen in code fences, in first-seen order.
    pub languages: Vec<String>,
    pub total_words: usize,
    pub duration_secs: Option<i64>,
    pub top_keywords: Vec<(String, usize)>,
}

impl SessionInsights {
    pub fn compute(blocks: &[Block]) -> Self {
        let mut insights = SessionInsights::default();
        let mut tools: HashMap<&str, usize> = HashMap::new();
        let mut words: HashMap<String, usize> = HashMap::new();

        for block in blocks {
            *insights.role_counts.entry(block.role).or_insert(0) += 1;

            if let BlockContent::ToolInvocation { name, .. } = &block.content {
                *tools.entry(name.as_str()).or_insert(0) += 1;
                insights.tool_invocations += 1;
            }

            if let Some(lang) = &block.language {
                if !insights.languages.iter().any(|l| l == lang) {
                    insights.languages.push(lang.clone());
                }
            }

            for word in block.text().split_whitespace() {
                insights.total_words += 1;
                let token: String = word
                    .trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase();
                if token.chars().count() >= MIN_KEYWORD_LEN
                    && token.chars().all(|c| c.is_alphabetic())
                    && !STOPWORDS.contains(&token.as_str())
                {
                    *words.entry(token).or_insert(0) += 1;
                }
            }
        }

        insights.top_tools = ranked(tools.into_iter().map(|(k, v)| (k.to_string(), v)), TOP_TOOLS);
        insights.top_keywords = ranked(words.into_iter(), TOP_KEYWORDS);

        if let (Some(first), Some(last)) = (
            blocks.iter().map(|b| b.timestamp).min(),
            blocks.iter().map(|b| b.timestamp).max(),
        ) {
            insights.duration_secs = Some((last - first).num_seconds());
        }

        insights
    }

    pub fn count(&self, role: Role) -> usize {
        self.role_counts.get(&role).copied().unwrap_or(0)
    }
}

/// Highest counts first, ties by name so output is stable.
fn ranked(items: impl Iterator<Item = (String, usize)>, limit: usize) -> Vec<(String, usize)> {
    let mut items: Vec<(String, usize)> = items.collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    items.truncate(limit);
    items
}
