//! Immutable, recency-ordered collection of parsed sessions.
//!
//! A store is built once per load. Narrowing it (by recency or path) produces a new
//! store sharing the same `Arc<Session>`s; nothing is re-parsed and nothing is mutated.

use crate::model::Session;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Vec<Arc<Session>>,
}

impl SessionStore {
    /// Build from a parse batch, newest modification first, ties by path.
    pub fn new(sessions: Vec<Session>) -> Self {
        Self::from_shared(sessions.into_iter().map(Arc::new).collect())
    }

    pub fn from_shared(mut sessions: Vec<Arc<Session>>) -> Self {
        sessions.sort_by(|a, b| recency_order(a, b));
        Self { sessions }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Session>> {
        self.sessions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Session>> {
        self.sessions.iter()
    }

    pub fn total_blocks(&self) -> usize {
        self.sessions.iter().map(|s| s.blocks.len()).sum()
    }

    /// Sessions modified at or after `cutoff`; `None` keeps everything.
    pub fn filter_recent(&self, cutoff: Option<DateTime<Utc>>) -> SessionStore {
        match cutoff {
            None => self.clone(),
            Some(cutoff) => self.retain(|s| s.metadata.modified.is_some_and(|m| m >= cutoff)),
        }
    }

    /// Sessions whose path contains `needle`, case-insensitively.
    pub fn filter_path(&self, needle: &str) -> SessionStore {
        let needle = needle.to_lowercase();
        self.retain(|s| s.path.to_string_lossy().to_lowercase().contains(&needle))
    }

    fn retain<F>(&self, keep: F) -> SessionStore
    where
        F: Fn(&Session) -> bool,
    {
        SessionStore {
            sessions: self
                .sessions
                .iter()
                .filter(|s| keep(s))
                .cloned()
                .collect(),
        }
    }
}

fn recency_order(a: &Session, b: &Session) -> Ordering {
    b.metadata
        .modified
        .cmp(&a.metadata.modified)
        .then_with(|| a.path.cmp(&b.path))
}
