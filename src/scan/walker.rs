use crate::config::ScanConfig;
use crate::error::{Result, ScanError, ScopeError};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use walkdir::{DirEntry, WalkDir};

/// Periodic liveness report emitted while walking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanProgress {
    pub entries_seen: usize,
    pub files_found: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Candidate files in walk order.
    pub files: Vec<PathBuf>,
    pub warnings: Vec<ScanError>,
    pub entries_seen: usize,
    pub elapsed: Duration,
}

impl ScanOutcome {
    pub fn timed_out(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, ScanError::Timeout { .. }))
    }
}

/// Identity of a directory independent of the path used to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DirKey {
    #[cfg(unix)]
    Inode(u64, u64),
    #[cfg(not(unix))]
    Canonical(PathBuf),
}

#[cfg(unix)]
fn dir_key(entry: &DirEntry) -> Option<DirKey> {
    use std::os::unix::fs::MetadataExt;
    entry
        .metadata()
        .ok()
        .map(|meta| DirKey::Inode(meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn dir_key(entry: &DirEntry) -> Option<DirKey> {
    std::fs::canonicalize(entry.path())
        .ok()
        .map(DirKey::Canonical)
}

/// Directory walker configured with depth, time and recency bounds.
#[derive(Debug, Clone)]
pub struct Scanner {
    config: ScanConfig,
    modified_after: Option<DateTime<Utc>>,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            modified_after: None,
        }
    }

    /// Only keep files modified at or after `cutoff`.
    pub fn with_cutoff(mut self, cutoff: Option<DateTime<Utc>>) -> Self {
        self.modified_after = cutoff;
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Walk `root`, calling `progress` every `progress_interval` entries.
    ///
    /// Blocking; run it on a blocking thread. Only a missing root is an error.
    pub fn scan<F>(&self, root: &Path, mut progress: F) -> Result<ScanOutcome>
    where
        F: FnMut(ScanProgress),
    {
        if !root.is_dir() {
            return Err(ScopeError::InvalidRoot {
                path: root.to_path_buf(),
            });
        }

        let started = Instant::now();
        let timeout = self.config.timeout();
        let interval = self.config.progress_interval.max(1);
        let mut outcome = ScanOutcome::default();
        let mut visited: HashSet<DirKey> = HashSet::new();

        let mut walker = WalkDir::new(root)
            .follow_links(self.config.follow_links)
            .sort_by_file_name()
            .into_iter();

        loop {
            let elapsed = started.elapsed();
            if elapsed >= timeout {
                log::warn!(
                    "scan of {} timed out after {:?} with {} files",
                    root.display(),
                    elapsed,
                    outcome.files.len()
                );
                outcome.warnings.push(ScanError::Timeout {
                    limit_ms: timeout.as_millis() as u64,
                    elapsed_ms: elapsed.as_millis() as u64,
                });
                break;
            }

            let entry = match walker.next() {
                Some(Ok(entry)) => entry,
                Some(Err(err)) => {
                    outcome.warnings.push(classify_walk_error(&err));
                    continue;
                }
                None => break,
            };

            outcome.entries_seen += 1;

            if entry.file_type().is_dir() {
                if let Some(key) = dir_key(&entry) {
                    if !visited.insert(key) {
                        log::warn!("symlink cycle at {}, not descending", entry.path().display());
                        outcome.warnings.push(ScanError::SymlinkCycle {
                            path: entry.path().to_path_buf(),
                        });
                        walker.skip_current_dir();
                        continue;
                    }
                }
                if entry.depth() >= self.config.max_depth {
                    log::warn!(
                        "depth limit {} reached at {}",
                        self.config.max_depth,
                        entry.path().display()
                    );
                    outcome.warnings.push(ScanError::DepthExceeded {
                        path: entry.path().to_path_buf(),
                        depth: entry.depth(),
                    });
                    walker.skip_current_dir();
                }
            } else if self.is_candidate(&entry) {
                outcome.files.push(entry.into_path());
            }

            if outcome.entries_seen % interval == 0 {
                progress(ScanProgress {
                    entries_seen: outcome.entries_seen,
                    files_found: outcome.files.len(),
                    elapsed: started.elapsed(),
                });
            }
        }

        outcome.elapsed = started.elapsed();
        log::debug!(
            "scanned {} entries under {} in {:?}: {} files, {} warnings",
            outcome.entries_seen,
            root.display(),
            outcome.elapsed,
            outcome.files.len(),
            outcome.warnings.len()
        );
        Ok(outcome)
    }

    fn is_candidate(&self, entry: &DirEntry) -> bool {
        if !entry.file_type().is_file() {
            return false;
        }
        let extension_matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(&self.config.extension))
            .unwrap_or(false);
        if !extension_matches {
            return false;
        }

        match self.modified_after {
            None => true,
            Some(cutoff) => entry
                .metadata()
                .ok()
                .and_then(|meta| meta.modified().ok())
                .map(|modified| DateTime::<Utc>::from(modified) >= cutoff)
                .unwrap_or(false),
        }
    }
}

fn classify_walk_error(err: &walkdir::Error) -> ScanError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();

    if err.loop_ancestor().is_some() {
        log::warn!("symlink loop at {}", path.display());
        return ScanError::SymlinkCycle { path };
    }

    match err.io_error().map(|io| io.kind()) {
        Some(ErrorKind::PermissionDenied) => {
            log::warn!("permission denied: {}", path.display());
            ScanError::PermissionDenied { path }
        }
        _ => {
            log::warn!("unreadable entry {}: {}", path.display(), err);
            ScanError::Unreadable {
                path,
                message: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "{}\n").unwrap();
    }

    fn scanner() -> Scanner {
        Scanner::new(ScanConfig::default())
    }

    #[test]
    fn finds_only_matching_extension_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b/2.jsonl"));
        touch(&dir.path().join("a/1.jsonl"));
        touch(&dir.path().join("a/notes.txt"));
        touch(&dir.path().join("c.JSONL"));

        let outcome = scanner().scan(dir.path(), |_| {}).unwrap();
        let names: Vec<_> = outcome
            .files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            names,
            vec![
                PathBuf::from("a/1.jsonl"),
                PathBuf::from("b/2.jsonl"),
                PathBuf::from("c.JSONL"),
            ]
        );
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = scanner()
            .scan(&dir.path().join("absent"), |_| {})
            .unwrap_err();
        assert!(matches!(err, ScopeError::InvalidRoot { .. }));
    }

    #[test]
    fn depth_limit_warns_and_stops_descending() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("one/shallow.jsonl"));
        touch(&dir.path().join("one/two/three/deep.jsonl"));

        let config = ScanConfig {
            max_depth: 2,
            ..ScanConfig::default()
        };
        let outcome = Scanner::new(config).scan(dir.path(), |_| {}).unwrap();

        assert_eq!(outcome.files.len(), 1);
        assert!(outcome.files[0].ends_with("shallow.jsonl"));
        assert!(outcome
            .warnings
            .iter()
            .any(|w| matches!(w, ScanError::DepthExceeded { depth: 2, .. })));
    }

    #[test]
    fn progress_is_reported_at_interval() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..10 {
            touch(&dir.path().join(format!("{i}.jsonl")));
        }
        let config = ScanConfig {
            progress_interval: 3,
            ..ScanConfig::default()
        };

        let mut reports = Vec::new();
        Scanner::new(config)
            .scan(dir.path(), |p| reports.push(p.entries_seen))
            .unwrap();

        // root + 10 files = 11 entries
        assert_eq!(reports, vec![3, 6, 9]);
    }

    #[test]
    fn recency_cutoff_filters_old_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("fresh.jsonl"));

        let future = Utc::now() + chrono::Duration::days(1);
        let outcome = scanner()
            .with_cutoff(Some(future))
            .scan(dir.path(), |_| {})
            .unwrap();
        assert!(outcome.files.is_empty());

        let past = Utc::now() - chrono::Duration::days(1);
        let outcome = scanner()
            .with_cutoff(Some(past))
            .scan(dir.path(), |_| {})
            .unwrap();
        assert_eq!(outcome.files.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycle_is_skipped_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a/session.jsonl"));
        std::os::unix::fs::symlink(dir.path().join("a"), dir.path().join("a/loop")).unwrap();

        let outcome = scanner().scan(dir.path(), |_| {}).unwrap();

        assert_eq!(outcome.files.len(), 1);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| matches!(w, ScanError::SymlinkCycle { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn same_directory_via_two_links_is_walked_once() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("real/session.jsonl"));
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("alias")).unwrap();

        let outcome = scanner().scan(dir.path(), |_| {}).unwrap();

        assert_eq!(outcome.files.len(), 1);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| matches!(w, ScanError::SymlinkCycle { .. })));
    }

    #[test]
    fn timeout_returns_partial_results() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..20 {
            touch(&dir.path().join(format!("{i:02}.jsonl")));
        }
        let config = ScanConfig {
            timeout_ms: 100,
            progress_interval: 1,
            ..ScanConfig::default()
        };

        let started = Instant::now();
        let outcome = Scanner::new(config)
            .scan(dir.path(), |_| std::thread::sleep(Duration::from_millis(20)))
            .unwrap();

        assert!(started.elapsed() < Duration::from_millis(300));
        assert!(outcome.timed_out());
        assert!(!outcome.files.is_empty());
        assert!(outcome.files.len() < 20);
    }
}
