//! Scan, parse and index a log root into a [`SessionStore`].
//!
//! The walk runs on a blocking thread and the parse on the bounded async pool; both
//! report progress through one callback so callers can forward it over a channel.

pub mod worker;

use crate::config::Config;
use crate::error::{FileFailure, Result, ScanError, ScopeError};
use crate::parse::{BatchStats, ParseProgress, SessionParser};
use crate::scan::{ScanProgress, Scanner};
use crate::store::SessionStore;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub use worker::load_worker_loop;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadProgress {
    Scanning(ScanProgress),
    Parsing(ParseProgress),
}

/// What a load skipped and why.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub files_found: usize,
    pub scan_warnings: Vec<ScanError>,
    pub scan_elapsed: Duration,
    pub failures: Vec<FileFailure>,
    pub stats: BatchStats,
}

impl LoadReport {
    /// One-line account for the status bar.
    pub fn summary(&self, sessions: usize) -> String {
        let mut parts = vec![format!("{sessions} sessions")];
        if self.stats.skipped_lines > 0 {
            parts.push(format!("{} skipped lines", self.stats.skipped_lines));
        }
        if self.stats.truncated_files > 0 {
            parts.push(format!("{} partial files", self.stats.truncated_files));
        }
        if !self.failures.is_empty() {
            parts.push(format!("{} failed files", self.failures.len()));
        }
        if !self.scan_warnings.is_empty() {
            parts.push(format!("{} scan warnings", self.scan_warnings.len()));
        }
        if self
            .scan_warnings
            .iter()
            .any(|w| matches!(w, ScanError::Timeout { .. }))
        {
            parts.push("scan timed out".to_string());
        }
        parts.join(", ")
    }
}

#[derive(Debug)]
pub struct Loaded {
    pub store: SessionStore,
    pub report: LoadReport,
}

/// Runs the scan and parse stages with one configuration.
#[derive(Debug, Clone, Default)]
pub struct Loader {
    config: Config,
}

impl Loader {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn load<F>(
        &self,
        root: &Path,
        modified_after: Option<DateTime<Utc>>,
        progress: F,
    ) -> Result<Loaded>
    where
        F: Fn(LoadProgress) + Send + Sync + 'static,
    {
        let progress = Arc::new(progress);

        let scanner = Scanner::new(self.config.scan.clone()).with_cutoff(modified_after);
        let scan_root = root.to_path_buf();
        let scan_progress = Arc::clone(&progress);
        let scan = tokio::task::spawn_blocking(move || {
            scanner.scan(&scan_root, |p| (*scan_progress)(LoadProgress::Scanning(p)))
        })
        .await
        .map_err(|err| ScopeError::other(format!("scan task failed: {err}")))??;

        log::info!(
            "found {} candidate files under {} in {:?}",
            scan.files.len(),
            root.display(),
            scan.elapsed
        );

        let parser = SessionParser::new(self.config.parse.clone());
        let files_found = scan.files.len();
        let batch = parser
            .parse_files(scan.files, |p| (*progress)(LoadProgress::Parsing(p)))
            .await;

        let store = SessionStore::new(batch.sessions);
        let report = LoadReport {
            files_found,
            scan_warnings: scan.warnings,
            scan_elapsed: scan.elapsed,
            failures: batch.failures,
            stats: batch.stats,
        };
        Ok(Loaded { store, report })
    }
}
