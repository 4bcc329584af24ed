//! Runtime configuration.
//!
//! Every tunable lives here and is passed explicitly to the component that uses it.
//! Values come from defaults, then an optional TOML file, then command-line overrides.
//!
//! ```toml
//! theme = "monochrome"
//!
//! [scan]
//! max_depth = 20
//! timeout_ms = 30000
//!
//! [parse]
//! max_consecutive_failures = 50
//!
//! [search]
//! direct_bonus = 1000
//!
//! [search.synonyms]
//! deploy = ["release", "rollout"]
//! ```

use crate::error::{Result, ScopeError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "sessionscope";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log root; `~/.claude/projects` when unset.
    pub root: Option<PathBuf>,
    pub theme: ThemeName,
    pub scan: ScanConfig,
    pub parse: ParseConfig,
    pub search: SearchConfig,
}

/// Palette for the terminal browser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    #[default]
    Color,
    /// Modifiers only, for terminals without color.
    Monochrome,
}

/// Bounds for the directory walk.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub max_depth: usize,
    pub timeout_ms: u64,
    pub follow_links: bool,
    /// File extension (without dot) that marks a candidate log.
    pub extension: String,
    /// Entries visited between two progress reports.
    pub progress_interval: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: 20,
            timeout_ms: 30_000,
            follow_links: true,
            extension: "jsonl".to_string(),
            progress_interval: 50,
        }
    }
}

impl ScanConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    pub max_consecutive_failures: usize,
    /// Files slower than this are logged as slow.
    pub slow_file_ms: u64,
    /// Per-file ceiling for on-disk size and for the blocks kept in memory.
    pub memory_ceiling_bytes: u64,
    /// Upper bound on concurrent file parses; the effective pool also respects the CPU count.
    pub max_concurrency: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 50,
            slow_file_ms: 5_000,
            memory_ceiling_bytes: 256 * 1024 * 1024,
            max_concurrency: 16,
        }
    }
}

impl ParseConfig {
    pub fn slow_file_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_file_ms)
    }

    /// Pool size actually used by the batch parser.
    pub fn effective_concurrency(&self) -> usize {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        cpus.min(self.max_concurrency).max(1)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub direct_bonus: i64,
    pub word_bonus: i64,
    pub max_matches: usize,
    pub max_sessions: usize,
    /// Bytes of block text the fuzzy matcher looks at.
    pub fuzzy_window: usize,
    /// Longest window, in chars, given skim's full alignment; longer ones use its linear
    /// scorer. Zero removes the limit.
    pub fuzzy_exact_chars: usize,
    /// Minimum fuzzy score per term character for a fuzzy hit to count.
    pub min_fuzzy_per_char: i64,
    pub snippet_before: usize,
    pub snippet_after: usize,
    pub snippet_max: usize,
    /// Extra synonym groups merged into the built-in table.
    pub synonyms: BTreeMap<String, Vec<String>>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            direct_bonus: 1000,
            word_bonus: 500,
            max_matches: 200,
            max_sessions: 50,
            fuzzy_window: 256,
            fuzzy_exact_chars: 128,
            min_fuzzy_per_char: 8,
            snippet_before: 100,
            snippet_after: 200,
            snippet_max: 300,
            synonyms: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Location of the user config file, if the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from `path`, or from the default location when `path` is `None`.
    ///
    /// A missing default file yields defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            ScopeError::config(format!("cannot read {}: {}", path.display(), err))
        })?;
        Self::from_toml(&text)
            .map_err(|err| ScopeError::config(format!("{}: {}", path.display(), err)))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| ScopeError::config(err.to_string()))
    }

    /// Resolved log root.
    pub fn root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        dirs::home_dir()
            .map(|home| home.join(".claude").join("projects"))
            .ok_or_else(|| ScopeError::config("no home directory; pass --dir"))
    }
}
