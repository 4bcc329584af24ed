//! Parsed conversation data.
//!
//! A [`Session`] is one log file; a [`Block`] is one record inside it. Both are built by
//! the parser and never modified afterwards.

pub mod insights;

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub use insights::SessionInsights;

/// Who produced a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

impl Role {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "user" | "human" => Some(Role::User),
            "assistant" | "ai" | "model" => Some(Role::Assistant),
            "system" => Some(Role::System),
            "tool" | "function" => Some(Role::Tool),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
        }
    }
}

/// Payload of a block. Closed set; anything unrecognised lands in `Unknown`.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockContent {
    Text(String),
    /// `call` is the tool name followed by its serialized input.
    ToolInvocation { name: String, call: String },
    SystemEvent { kind: String, detail: String },
    Unknown { kind: String, raw: String },
}

impl BlockContent {
    pub fn tool_invocation(name: impl Into<String>, input: &str) -> Self {
        let name = name.into();
        let call = if input.is_empty() {
            name.clone()
        } else {
            format!("{name} {input}")
        };
        BlockContent::ToolInvocation { name, call }
    }

    /// Text the scorer and snippet builder operate on.
    pub fn text(&self) -> &str {
        match self {
            BlockContent::Text(text) => text,
            BlockContent::ToolInvocation { call, .. } => call,
            BlockContent::SystemEvent { detail, .. } => detail,
            BlockContent::Unknown { raw, .. } => raw,
        }
    }

    pub fn kind_label(&self) -> &str {
        match self {
            BlockContent::Text(_) => "text",
            BlockContent::ToolInvocation { name, .. } => name,
            BlockContent::SystemEvent { kind, .. } => kind,
            BlockContent::Unknown { kind, .. } => kind,
        }
    }

    /// Bytes retained by this payload, used for the per-file memory ceiling.
    pub fn retained_bytes(&self) -> usize {
        match self {
            BlockContent::Text(text) => text.len(),
            BlockContent::ToolInvocation { name, call } => name.len() + call.len(),
            BlockContent::SystemEvent { kind, detail } => kind.len() + detail.len(),
            BlockContent::Unknown { kind, raw } => kind.len() + raw.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Record uuid, or `line-<n>` when the record has none.
    pub id: String,
    /// 1-based source line.
    pub line: usize,
    pub timestamp: DateTime<Utc>,
    pub role: Role,
    pub content: BlockContent,
    /// Token count reported by the record, else the character count.
    pub size_estimate: u64,
    /// Language tag of the first fenced code block, if any.
    pub language: Option<String>,
}

impl Block {
    pub fn text(&self) -> &str {
        self.content.text()
    }

    /// Approximate heap and inline bytes this block keeps alive.
    pub fn retained_bytes(&self) -> usize {
        std::mem::size_of::<Block>()
            + self.id.len()
            + self.content.retained_bytes()
            + self.language.as_ref().map_or(0, String::len)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionMetadata {
    pub size_bytes: u64,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    /// Non-empty lines seen during the content pass.
    pub line_count: usize,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
}

/// Per-file accounting of what the parser kept and skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    pub parsed_blocks: usize,
    pub skipped_lines: usize,
    pub non_empty_lines: usize,
    /// Parsing stopped early after too many consecutive failures.
    pub truncated: bool,
    /// First few line errors, for the status view.
    pub sample_errors: Vec<crate::error::ParseError>,
    pub elapsed_ms: u64,
}

impl ParseReport {
    /// Every non-empty line is either a block or a skipped line.
    pub fn is_balanced(&self) -> bool {
        self.parsed_blocks + self.skipped_lines == self.non_empty_lines
    }
}

/// One parsed log file.
#[derive(Debug)]
pub struct Session {
    pub path: PathBuf,
    pub metadata: SessionMetadata,
    pub blocks: Vec<Block>,
    pub report: ParseReport,
    insights: OnceLock<SessionInsights>,
}

impl Session {
    pub fn new(
        path: PathBuf,
        metadata: SessionMetadata,
        blocks: Vec<Block>,
        report: ParseReport,
    ) -> Self {
        Self {
            path,
            metadata,
            blocks,
            report,
            insights: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File stem, which for these logs is the session uuid.
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("<unnamed>")
            .to_string()
    }

    /// Parent directory name, which encodes the project the session belongs to.
    pub fn project(&self) -> Option<String> {
        self.path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
    }

    /// Derived statistics, computed on first access.
    pub fn insights(&self) -> &SessionInsights {
        self.insights
            .get_or_init(|| SessionInsights::compute(&self.blocks))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub fn block(line: usize, role: Role, text: &str) -> Block {
        Block {
            id: format!("line-{line}"),
            line,
            timestamp: Utc
                .with_ymd_and_hms(2024, 5, 1, 12, 0, line as u32 % 60)
                .unwrap(),
            role,
            content: BlockContent::Text(text.to_string()),
            size_estimate: text.chars().count() as u64,
            language: None,
        }
    }

    pub fn session(path: &str, modified_secs: i64, texts: &[&str]) -> Session {
        let blocks: Vec<Block> = texts
            .iter()
            .enumerate()
            .map(|(idx, text)| block(idx + 1, Role::User, text))
            .collect();
        let report = ParseReport {
            parsed_blocks: blocks.len(),
            non_empty_lines: blocks.len(),
            ..ParseReport::default()
        };
        Session::new(
            PathBuf::from(path),
            SessionMetadata {
                size_bytes: 0,
                created: None,
                modified: Utc.timestamp_opt(modified_secs, 0).single(),
                line_count: blocks.len(),
                first_timestamp: blocks.first().map(|b| b.timestamp),
                last_timestamp: blocks.last().map(|b| b.timestamp),
            },
            blocks,
            report,
        )
    }
}
