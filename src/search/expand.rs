//! Query expansion.
//!
//! Turns what the user typed into an ordered list of match terms:
//!
//! 1. the trimmed literal query,
//! 2. quoted sub-phrases,
//! 3. pieces of compound identifiers (`parseSession`, `HTTPServer`, `rate-limit`),
//! 4. each word of a multi-word query,
//! 5. synonyms of every token.
//!
//! Duplicates are removed case-insensitively, keeping the first occurrence.

use crate::search::fold::fold;
use crate::search::synonyms::SynonymTable;
use std::collections::HashSet;

const MIN_TERM_CHARS: usize = 2;

/// Result of expanding one query. `terms[0]` is the literal whenever the query is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandedQuery {
    pub literal: String,
    pub terms: Vec<String>,
}

impl ExpandedQuery {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms added on top of the literal.
    pub fn expansions(&self) -> &[String] {
        self.terms.get(1..).unwrap_or(&[])
    }
}

/// Expands queries against a fixed synonym table.
#[derive(Debug, Clone, Default)]
pub struct QueryExpander {
    synonyms: SynonymTable,
}

impl QueryExpander {
    pub fn new(synonyms: SynonymTable) -> Self {
        Self { synonyms }
    }

    pub fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    pub fn expand(&self, query: &str) -> ExpandedQuery {
        expand(query, &self.synonyms)
    }
}

/// Pure expansion of `query`; identical input always yields identical output.
pub fn expand(query: &str, synonyms: &SynonymTable) -> ExpandedQuery {
    let literal = query.trim();
    if literal.is_empty() {
        return ExpandedQuery::default();
    }
    let mut terms = TermSet::default();
    terms.push(literal);

    for phrase in quoted_phrases(literal) {
        terms.push(phrase);
    }

    let words: Vec<&str> = literal
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '-' && c != '_'))
        .filter(|w| !w.is_empty())
        .collect();

    let mut tokens: Vec<String> = Vec::new();
    for word in &words {
        let pieces = split_compound(word);
        if pieces.len() > 1 {
            for piece in &pieces {
                if piece.chars().count() >= MIN_TERM_CHARS {
                    terms.push(piece);
                }
            }
        }
        tokens.extend(pieces);
    }

    if words.len() > 1 {
        for word in &words {
            if word.chars().count() >= MIN_TERM_CHARS {
                terms.push(word);
            }
        }
    }
    tokens.extend(words.iter().map(|w| w.to_string()));

    for token in &tokens {
        for related in synonyms.lookup(token) {
            terms.push(related);
        }
    }

    ExpandedQuery {
        literal: literal.to_string(),
        terms: terms.into_vec(),
    }
}

/// Ordered set with case-insensitive membership.
#[derive(Default)]
struct TermSet {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl TermSet {
    fn push(&mut self, term: &str) {
        let term = term.trim();
        if term.is_empty() {
            return;
        }
        if self.seen.insert(fold(term)) {
            self.ordered.push(term.to_string());
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}

fn quoted_phrases(text: &str) -> Vec<&str> {
    let mut phrases = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find('"') {
        let after = &rest[open + 1..];
        match after.find('"') {
            Some(close) => {
                let phrase = after[..close].trim();
                if !phrase.is_empty() {
                    phrases.push(phrase);
                }
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    phrases
}

/// Split on `-`, `_`, `.`, `/`, then on case changes.
///
/// `HTTPServer` becomes `HTTP`, `Server`; `parseJSONLine` becomes `parse`, `JSON`, `Line`.
pub fn split_compound(word: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    for part in word.split(['-', '_', '.', '/']) {
        split_case(part, &mut pieces);
    }
    pieces
}

fn split_case(part: &str, out: &mut Vec<String>) {
    let chars: Vec<char> = part.chars().collect();
    let mut current = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        let prev = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();
        let boundary = match prev {
            Some(prev) if ch.is_uppercase() => {
                prev.is_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_uppercase() && next.is_some_and(|n| n.is_lowercase()))
            }
            _ => false,
        };
        if boundary && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() {
        out.push(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn federation_table() -> SynonymTable {
        SynonymTable::from_entries([("federation", ["agent", "coordination", "protocol"])])
    }

    #[test]
    fn empty_query_expands_to_nothing() {
        let expanded = expand("   ", &SynonymTable::builtin());
        assert!(expanded.is_empty());
        assert!(expanded.expansions().is_empty());
    }

    #[test]
    fn literal_comes_first_then_synonyms() {
        let expanded = expand("federation", &federation_table());
        assert_eq!(
            expanded.terms,
            vec!["federation", "agent", "coordination", "protocol"]
        );
        assert_eq!(expanded.literal, "federation");
    }

    #[test]
    fn compound_identifiers_are_split() {
        assert_eq!(split_compound("parseSession"), vec!["parse", "Session"]);
        assert_eq!(split_compound("HTTPServer"), vec!["HTTP", "Server"]);
        assert_eq!(split_compound("rate-limit_v2"), vec!["rate", "limit", "v2"]);
        assert_eq!(split_compound("plain"), vec!["plain"]);

        let expanded = expand("parseJSONLine", &SynonymTable::empty());
        assert_eq!(expanded.terms, vec!["parseJSONLine", "parse", "JSON", "Line"]);
    }

    #[test]
    fn quoted_phrases_and_words_are_terms() {
        let expanded = expand(r#"fix "rate limit" bug"#, &SynonymTable::empty());
        assert_eq!(
            expanded.terms,
            vec![r#"fix "rate limit" bug"#, "rate limit", "fix", "rate", "limit", "bug"]
        );
    }

    #[test]
    fn duplicates_are_removed_case_insensitively() {
        let table = SynonymTable::from_entries([
            ("agent", vec!["Agents", "bot"]),
            ("bot", vec!["agents"]),
        ]);
        let expanded = expand("agent bot", &table);
        assert_eq!(expanded.terms, vec!["agent bot", "agent", "bot", "agents"]);
    }

    #[test]
    fn expansion_is_deterministic() {
        let table = SynonymTable::builtin();
        let first = expand("debug the federation memory", &table);
        for _ in 0..5 {
            assert_eq!(expand("debug the federation memory", &table), first);
        }
    }
}
