//! Bounded-concurrency parsing of many files.

use crate::error::{FileFailure, ScopeError};
use crate::model::Session;
use crate::parse::SessionParser;
use futures::stream::{FuturesUnordered, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Emitted once per finished file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseProgress {
    pub done: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchStats {
    pub files: usize,
    pub parsed_blocks: usize,
    pub skipped_lines: usize,
    pub truncated_files: usize,
    pub elapsed: Duration,
}

/// Sessions that parsed, in input order, plus the files that did not.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub sessions: Vec<Session>,
    pub failures: Vec<FileFailure>,
    pub stats: BatchStats,
}

impl SessionParser {
    /// Parse `paths` with at most `effective_concurrency()` files in flight.
    ///
    /// Never fails as a whole; per-file errors end up in `failures`.
    pub async fn parse_files<F>(&self, paths: Vec<PathBuf>, mut on_progress: F) -> BatchOutcome
    where
        F: FnMut(ParseProgress),
    {
        let started = Instant::now();
        let total = paths.len();
        let permits = self.config().effective_concurrency();
        let semaphore = Arc::new(Semaphore::new(permits));
        log::debug!("parsing {} files with {} workers", total, permits);

        let mut pending = FuturesUnordered::new();
        for (index, path) in paths.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let parser = self.clone();
            pending.push(async move {
                let handle = tokio::spawn({
                    let path = path.clone();
                    async move {
                        let _permit = semaphore
                            .acquire_owned()
                            .await
                            .map_err(|_| ScopeError::other("parse pool closed"))?;
                        parser.parse_file(&path).await
                    }
                });
                let result = handle.await.unwrap_or_else(|err| {
                    Err(ScopeError::other(format!("parse task failed: {err}")))
                });
                (index, path, result)
            });
        }

        let mut finished = Vec::with_capacity(total);
        let mut done = 0usize;
        while let Some(item) = pending.next().await {
            done += 1;
            on_progress(ParseProgress { done, total });
            finished.push(item);
        }
        finished.sort_by_key(|(index, _, _)| *index);

        let mut outcome = BatchOutcome::default();
        for (_, path, result) in finished {
            match result {
                Ok(session) => {
                    outcome.stats.parsed_blocks += session.report.parsed_blocks;
                    outcome.stats.skipped_lines += session.report.skipped_lines;
                    if session.report.truncated {
                        outcome.stats.truncated_files += 1;
                    }
                    outcome.sessions.push(session);
                }
                Err(error) => {
                    log::warn!("skipping {}: {}", path.display(), error);
                    outcome.failures.push(FileFailure { path, error });
                }
            }
        }
        outcome.stats.files = total;
        outcome.stats.elapsed = started.elapsed();
        log::info!(
            "parsed {} of {} files ({} blocks, {} skipped lines) in {:?}",
            outcome.sessions.len(),
            total,
            outcome.stats.parsed_blocks,
            outcome.stats.skipped_lines,
            outcome.stats.elapsed
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseConfig;
    use std::fs;

    fn write_session(dir: &std::path::Path, name: &str, count: usize) -> PathBuf {
        let path = dir.join(name);
        let body: String = (0..count)
            .map(|i| {
                format!(
                    "{{\"role\":\"user\",\"content\":\"{name} {i}\",\"timestamp\":\"2024-05-01T10:00:00Z\"}}\n"
                )
            })
            .collect();
        fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn keeps_input_order_and_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![
            write_session(dir.path(), "a.jsonl", 3),
            dir.path().join("missing.jsonl"),
            write_session(dir.path(), "b.jsonl", 2),
        ];

        let mut progress = Vec::new();
        let outcome = SessionParser::new(ParseConfig {
            max_concurrency: 2,
            ..ParseConfig::default()
        })
        .parse_files(paths, |p| progress.push(p))
        .await;

        assert_eq!(outcome.sessions.len(), 2);
        assert!(outcome.sessions[0].path.ends_with("a.jsonl"));
        assert!(outcome.sessions[1].path.ends_with("b.jsonl"));
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].path.ends_with("missing.jsonl"));
        assert_eq!(outcome.stats.parsed_blocks, 5);
        assert_eq!(progress.len(), 3);
        assert_eq!(progress.last(), Some(&ParseProgress { done: 3, total: 3 }));
    }

    #[tokio::test]
    async fn empty_batch_is_empty() {
        let outcome = SessionParser::default().parse_files(Vec::new(), |_| {}).await;
        assert!(outcome.sessions.is_empty());
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.stats.files, 0);
    }
}
