//! Multi-signal relevance ranking over a session store.
//!
//! Each block is checked for three signals:
//!
//! - **Direct**: the literal query occurs in the block, ignoring case.
//! - **Fuzzy**: some expanded term matches as a skim-style subsequence with a score of at
//!   least `min_fuzzy_per_char` per term character.
//! - **Word**: some expanded term occurs as a whole word. Only consulted when the first two
//!   found nothing.
//!
//! Matches sort by tier (Direct, Word, Fuzzy), score, session recency and block position.
//! The tier makes the ordering independent of the bonus magnitudes.

use crate::config::SearchConfig;
use crate::model::Block;
use crate::search::expand::ExpandedQuery;
use crate::search::fold::{fold, FoldedText};
use crate::search::snippet::{Snippet, SnippetWindow};
use crate::store::SessionStore;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use grep_matcher::Matcher;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};
use memchr::memmem::Finder;
use std::collections::HashSet;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchTier {
    Fuzzy,
    Word,
    Direct,
}

impl MatchTier {
    pub fn label(self) -> &'static str {
        match self {
            MatchTier::Fuzzy => "fuzzy",
            MatchTier::Word => "word",
            MatchTier::Direct => "direct",
        }
    }
}

/// One ranked block. Indices point into the store the search ran against.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchMatch {
    pub session_index: usize,
    pub block_index: usize,
    pub tier: MatchTier,
    pub score: i64,
    pub snippet: Snippet,
}

#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub query: ExpandedQuery,
    pub matches: Vec<SearchMatch>,
    /// Distinct sessions in the order their best match ranks.
    pub session_order: Vec<usize>,
    /// Blocks with a signal before the result caps were applied.
    pub candidates: usize,
    pub elapsed: Duration,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Position of the first match that belongs to `session_index`.
    pub fn first_match_in(&self, session_index: usize) -> Option<usize> {
        self.matches
            .iter()
            .position(|m| m.session_index == session_index)
    }
}

/// Where the signal fired, before snippets are built.
struct Hit {
    session_index: usize,
    block_index: usize,
    tier: MatchTier,
    score: i64,
    anchor: usize,
}

/// Bytes of context kept around a literal term occurrence when scoring it.
const LOCAL_CONTEXT: usize = 16;

/// An expanded term folded and indexed once per search.
struct Term<'q> {
    text: &'q str,
    finder: Finder<'static>,
    chars: usize,
    /// Lowercase ASCII bytes the term needs; a window missing any of them cannot match.
    mask: u128,
}

impl<'q> Term<'q> {
    fn new(text: &'q str) -> Self {
        let folded = fold(text);
        Self {
            text,
            mask: ascii_mask(&folded),
            finder: Finder::new(folded.as_bytes()).into_owned(),
            chars: text.chars().count(),
        }
    }
}

pub struct RelevanceScorer {
    config: SearchConfig,
    matcher: SkimMatcherV2,
}

impl std::fmt::Debug for RelevanceScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelevanceScorer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RelevanceScorer {
    pub fn new(config: SearchConfig) -> Self {
        // skim falls back to its linear scorer once the two-row matrix would exceed this
        let element_limit = match config.fuzzy_exact_chars {
            0 => 0,
            chars => 2 * (chars + 1),
        };
        Self {
            matcher: SkimMatcherV2::default()
                .ignore_case()
                .element_limit(element_limit),
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    fn window(&self) -> SnippetWindow {
        SnippetWindow {
            before: self.config.snippet_before,
            after: self.config.snippet_after,
            max: self.config.snippet_max,
        }
    }

    /// Rank every block of `store` against `query`.
    pub fn score(&self, query: &ExpandedQuery, store: &SessionStore) -> SearchResults {
        let started = Instant::now();
        if query.is_empty() {
            return SearchResults {
                query: query.clone(),
                elapsed: started.elapsed(),
                ..SearchResults::default()
            };
        }

        let literal = Finder::new(fold(&query.literal).as_bytes()).into_owned();
        let terms: Vec<Term<'_>> = query.terms.iter().map(|t| Term::new(t)).collect();
        let needles: Vec<String> = query.terms.iter().map(|t| fold(t)).collect();
        let word_matchers = build_word_matchers(&query.terms);

        let mut hits: Vec<Hit> = Vec::new();
        for (session_index, session) in store.iter().enumerate() {
            for (block_index, block) in session.blocks.iter().enumerate() {
                if let Some((tier, score, anchor)) =
                    self.score_block(block, &literal, &terms, &word_matchers)
                {
                    hits.push(Hit {
                        session_index,
                        block_index,
                        tier,
                        score,
                        anchor,
                    });
                }
            }
        }

        hits.sort_by(|a, b| {
            b.tier
                .cmp(&a.tier)
                .then_with(|| b.score.cmp(&a.score))
                .then_with(|| a.session_index.cmp(&b.session_index))
                .then_with(|| a.block_index.cmp(&b.block_index))
        });
        let candidates = hits.len();

        let mut session_order: Vec<usize> = Vec::new();
        let mut seen_sessions: HashSet<usize> = HashSet::new();
        let mut matches: Vec<SearchMatch> = Vec::new();
        let window = self.window();

        for hit in hits {
            if matches.len() >= self.config.max_matches {
                break;
            }
            if !seen_sessions.contains(&hit.session_index) {
                if seen_sessions.len() >= self.config.max_sessions {
                    continue;
                }
                seen_sessions.insert(hit.session_index);
                session_order.push(hit.session_index);
            }

            let Some(block) = store
                .get(hit.session_index)
                .and_then(|s| s.blocks.get(hit.block_index))
            else {
                continue;
            };
            let snippet = Snippet::build(block.text(), hit.anchor, window, &needles);
            matches.push(SearchMatch {
                session_index: hit.session_index,
                block_index: hit.block_index,
                tier: hit.tier,
                score: hit.score,
                snippet,
            });
        }

        let elapsed = started.elapsed();
        log::debug!(
            "query {:?}: {} terms, {} candidates, {} kept in {:?}",
            query.literal,
            query.terms.len(),
            candidates,
            matches.len(),
            elapsed
        );

        SearchResults {
            query: query.clone(),
            matches,
            session_order,
            candidates,
            elapsed,
        }
    }

    /// Tier, score and anchor byte for one block, or `None` when nothing fired.
    fn score_block(
        &self,
        block: &Block,
        literal: &Finder<'_>,
        terms: &[Term<'_>],
        word_matchers: &[RegexMatcher],
    ) -> Option<(MatchTier, i64, usize)> {
        let text = block.text();
        if text.is_empty() {
            return None;
        }

        let folded = FoldedText::new(text);
        let direct = folded.find_with(literal);
        let fuzzy = self.best_fuzzy(&folded, terms);

        if let Some((start, _)) = direct {
            let bonus = fuzzy.map_or(0, |(score, _)| score);
            return Some((MatchTier::Direct, self.config.direct_bonus + bonus, start));
        }

        if let Some((score, term)) = fuzzy {
            let anchor = folded.find_with(&term.finder).map_or(0, |(start, _)| start);
            return Some((MatchTier::Fuzzy, score, anchor));
        }

        word_matchers.iter().find_map(|matcher| {
            match matcher.find(text.as_bytes()) {
                Ok(Some(found)) => Some((MatchTier::Word, self.config.word_bonus, found.start())),
                _ => None,
            }
        })
    }

    /// Best qualifying fuzzy score over all terms, with the term that produced it.
    ///
    /// Only the first `fuzzy_window` bytes are considered. Terms whose bytes are missing
    /// from that window are skipped, and a term occurring literally is scored on the
    /// occurrence and its immediate context instead of the whole window.
    fn best_fuzzy<'a, 'q>(
        &self,
        folded: &FoldedText<'_>,
        terms: &'a [Term<'q>],
    ) -> Option<(i64, &'a Term<'q>)> {
        let window = prefix_within(folded.original(), self.config.fuzzy_window);
        let available = lowered_ascii_mask(window);

        let mut best: Option<(i64, &'a Term<'q>)> = None;
        for term in terms {
            if term.mask & !available != 0 {
                continue;
            }
            let scope = match folded.find_with(&term.finder) {
                Some((start, end)) if end <= window.len() => {
                    around(window, start, end, LOCAL_CONTEXT)
                }
                _ => window,
            };
            let Some(score) = self.matcher.fuzzy_match(scope, term.text) else {
                continue;
            };
            let floor = self.config.min_fuzzy_per_char * term.chars as i64;
            if score >= floor && best.map_or(true, |(b, _)| score > b) {
                best = Some((score, term));
            }
        }
        best
    }
}

fn build_word_matchers(terms: &[String]) -> Vec<RegexMatcher> {
    terms
        .iter()
        .filter_map(|term| {
            RegexMatcherBuilder::new()
                .case_insensitive(true)
                .word(true)
                .fixed_strings(true)
                .build(term)
                .map_err(|err| log::debug!("no word matcher for {:?}: {}", term, err))
                .ok()
        })
        .collect()
}

/// Bit per ASCII byte present in already-folded text.
fn ascii_mask(folded: &str) -> u128 {
    folded
        .bytes()
        .filter(u8::is_ascii)
        .fold(0, |mask, b| mask | 1u128 << b)
}

/// Like [`ascii_mask`], lowering ASCII letters on the way.
fn lowered_ascii_mask(text: &str) -> u128 {
    text.bytes()
        .filter(u8::is_ascii)
        .fold(0, |mask, b| mask | 1u128 << b.to_ascii_lowercase())
}

/// Longest prefix of `text` no longer than `limit` bytes, cut on a char boundary.
fn prefix_within(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// `text[start..end]` widened by up to `margin` bytes on each side, on char boundaries.
fn around(text: &str, start: usize, end: usize, margin: usize) -> &str {
    let mut from = start.saturating_sub(margin);
    while from > 0 && !text.is_char_boundary(from) {
        from -= 1;
    }
    let mut to = end.saturating_add(margin).min(text.len());
    while to < text.len() && !text.is_char_boundary(to) {
        to += 1;
    }
    &text[from..to]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::session;
    use crate::search::expand::expand;
    use crate::search::synonyms::SynonymTable;

    fn scorer() -> RelevanceScorer {
        RelevanceScorer::new(SearchConfig::default())
    }

    #[test]
    fn empty_query_has_no_matches() {
        let store = SessionStore::new(vec![session("/l/a.jsonl", 1, &["anything"])]);
        let results = scorer().score(&expand("  ", &SynonymTable::builtin()), &store);
        assert!(results.is_empty());
        assert!(results.session_order.is_empty());
    }

    #[test]
    fn literal_match_outranks_fuzzy_only() {
        let store = SessionStore::new(vec![
            session("/l/newer.jsonl", 200, &["pxaxrxsxexr is spread out"]),
            session("/l/older.jsonl", 100, &["the parser failed"]),
        ]);
        let query = expand("parser", &SynonymTable::empty());
        let results = RelevanceScorer::new(SearchConfig {
            min_fuzzy_per_char: 0,
            ..SearchConfig::default()
        })
        .score(&query, &store);

        assert_eq!(results.matches[0].tier, MatchTier::Direct);
        assert!(results.matches[0].snippet.text.contains("the parser failed"));
        if let Some(second) = results.matches.get(1) {
            assert_eq!(second.tier, MatchTier::Fuzzy);
            assert!(second.score < results.matches[0].score);
        }
    }

    #[test]
    fn synonym_hit_ranks_below_literal() {
        let store = SessionStore::new(vec![
            session("/l/a.jsonl", 300, &["we need better coordination"]),
            session("/l/b.jsonl", 100, &["the federation is live"]),
        ]);
        let table =
            SynonymTable::from_entries([("federation", ["agent", "coordination", "protocol"])]);
        let results = scorer().score(&expand("federation", &table), &store);

        assert_eq!(results.len(), 2);
        assert_eq!(results.matches[0].tier, MatchTier::Direct);
        assert!(results.matches[0].snippet.text.contains("federation"));
        assert!(results.matches[1].snippet.text.contains("coordination"));
        assert_eq!(results.session_order, vec![1, 0]);
    }

    #[test]
    fn whole_word_beyond_fuzzy_window_is_word_tier() {
        let text = format!("{} protocol", "x".repeat(64));
        let store = SessionStore::new(vec![session("/l/a.jsonl", 1, &[text.as_str()])]);
        let table = SynonymTable::from_entries([("federation", ["protocol"])]);
        let scorer = RelevanceScorer::new(SearchConfig {
            fuzzy_window: 16,
            ..SearchConfig::default()
        });

        let results = scorer.score(&expand("federation", &table), &store);
        assert_eq!(results.len(), 1);
        assert_eq!(results.matches[0].tier, MatchTier::Word);
        assert_eq!(results.matches[0].score, 500);
        let (s, e) = results.matches[0].snippet.highlights[0];
        assert_eq!(&results.matches[0].snippet.text[s..e], "protocol");
    }

    #[test]
    fn caps_limit_matches_and_sessions() {
        let sessions = (0..5)
            .map(|i| session(&format!("/l/{i}.jsonl"), 100 - i, &["alpha", "alpha beta", "alpha"]))
            .collect();
        let store = SessionStore::new(sessions);
        let query = expand("alpha", &SynonymTable::empty());

        let results = RelevanceScorer::new(SearchConfig {
            max_sessions: 2,
            ..SearchConfig::default()
        })
        .score(&query, &store);
        assert_eq!(results.session_order.len(), 2);
        assert_eq!(results.len(), 6);
        assert_eq!(results.candidates, 15);

        let results = RelevanceScorer::new(SearchConfig {
            max_matches: 4,
            ..SearchConfig::default()
        })
        .score(&query, &store);
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn ties_break_by_recency_then_position() {
        let store = SessionStore::new(vec![
            session("/l/old.jsonl", 1, &["token", "token"]),
            session("/l/new.jsonl", 2, &["token"]),
        ]);
        let results = scorer().score(&expand("token", &SynonymTable::empty()), &store);
        let order: Vec<(usize, usize)> = results
            .matches
            .iter()
            .map(|m| (m.session_index, m.block_index))
            .collect();
        assert_eq!(order, vec![(0, 0), (1, 0), (1, 1)]);
    }

    #[test]
    fn prefix_never_splits_chars() {
        assert_eq!(prefix_within("héllo", 2), "h");
        assert_eq!(prefix_within("abc", 10), "abc");
    }

    #[test]
    fn context_around_stays_on_char_boundaries() {
        assert_eq!(around("ééé needle ééé", 7, 13, 2), "é needle é");
        assert_eq!(around("needle", 0, 6, 16), "needle");
    }

    #[test]
    fn final_sigma_query_matches_directly() {
        let store = SessionStore::new(vec![session("/l/a.jsonl", 1, &["Η ΟΔΟΣ είναι κλειστή"])]);
        let results = scorer().score(&expand("ΟΔΟΣ", &SynonymTable::empty()), &store);
        assert_eq!(results.len(), 1);
        assert_eq!(results.matches[0].tier, MatchTier::Direct);
    }

    #[test]
    fn tool_name_is_searchable() {
        let mut tool_session = session("/l/a.jsonl", 1, &["", "listing files"]);
        tool_session.blocks[0].content =
            crate::model::BlockContent::tool_invocation("Bash", r#"{"command":"ls -la"}"#);
        let store = SessionStore::new(vec![tool_session]);

        let results = scorer().score(&expand("bash", &SynonymTable::empty()), &store);
        assert_eq!(results.len(), 1);
        assert_eq!(results.matches[0].block_index, 0);
        assert_eq!(results.matches[0].tier, MatchTier::Direct);
    }

    #[test]
    fn terms_missing_from_the_window_are_not_fuzzy() {
        let store = SessionStore::new(vec![session(
            "/l/a.jsonl",
            1,
            &["abc abc abc abc abc abc abc abc"],
        )]);
        let results = RelevanceScorer::new(SearchConfig {
            min_fuzzy_per_char: 0,
            ..SearchConfig::default()
        })
        .score(&expand("zebra", &SynonymTable::empty()), &store);
        assert!(results.is_empty());
    }

    #[test]
    fn long_windows_still_score_scattered_terms() {
        let text = format!("p a r s e r {}", "filler words ".repeat(40));
        let store = SessionStore::new(vec![session("/l/a.jsonl", 1, &[text.as_str()])]);
        let results = RelevanceScorer::new(SearchConfig {
            min_fuzzy_per_char: 0,
            fuzzy_exact_chars: 32,
            ..SearchConfig::default()
        })
        .score(&expand("parser", &SynonymTable::empty()), &store);
        assert_eq!(results.len(), 1);
        assert_eq!(results.matches[0].tier, MatchTier::Fuzzy);
    }
}
