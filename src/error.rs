//! Error types and handling infrastructure for sessionscope.
//!
//! Three layers of failure exist and none of them is fatal to a load:
//!
//! - [`ScanError`] values are warnings collected while walking the log root.
//! - [`ParseError`] values describe a single skipped line inside a file.
//! - [`ScopeError`] is the crate-wide error; when it is raised for one file during a
//!   batch parse it is wrapped in a [`FileFailure`] and the batch continues.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for sessionscope operations.
#[derive(Error, Debug)]
pub enum ScopeError {
    /// File system related errors (unreadable file, vanished file, etc.)
    #[error("File operation failed: {message}")]
    FileError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// File disappeared between listing and opening
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// File is larger than the per-file memory ceiling
    #[error("File too large: {path} ({size} bytes, limit {limit})")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    /// Retained content crossed the per-file memory ceiling mid-parse
    #[error("Memory ceiling of {limit} bytes exceeded while parsing {path}")]
    MemoryCeiling { path: PathBuf, limit: u64 },

    /// The log root is missing or not a directory
    #[error("Invalid log root: {path}")]
    InvalidRoot { path: PathBuf },

    /// UI and terminal related errors
    #[error("UI operation failed: {message}")]
    UIError { message: String },

    /// Configuration file could not be read or decoded
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Invalid command line arguments
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Generic error for cases not covered by specific variants
    #[error("Operation failed: {message}")]
    Other { message: String },
}

/// Standard Result type for sessionscope operations.
pub type Result<T> = std::result::Result<T, ScopeError>;

impl ScopeError {
    /// Create a FileError from an io::Error with additional context
    pub fn file_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileError {
            message: message.into(),
            source,
        }
    }

    /// Map an io::Error raised while opening `path`, keeping the path for NotFound.
    pub fn open_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound { path }
        } else {
            Self::FileError {
                message: format!("cannot open {}", path.display()),
                source,
            }
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a UIError with a descriptive message
    pub fn ui(message: impl Into<String>) -> Self {
        Self::UIError {
            message: message.into(),
        }
    }

    /// Create a generic Other error with a descriptive message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ScopeError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileError {
                message: "File not found".to_string(),
                source: err,
            },
            std::io::ErrorKind::PermissionDenied => Self::FileError {
                message: "Permission denied".to_string(),
                source: err,
            },
            _ => Self::FileError {
                message: "IO operation failed".to_string(),
                source: err,
            },
        }
    }
}

/// Recoverable conditions met while walking the log root.
///
/// A scan never fails because of these; they are returned next to the partial file list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Symlink cycle skipped at {path}")]
    SymlinkCycle { path: PathBuf },

    #[error("Depth limit {depth} reached at {path}")]
    DepthExceeded { path: PathBuf, depth: usize },

    #[error("Scan timed out after {elapsed_ms}ms (limit {limit_ms}ms)")]
    Timeout { limit_ms: u64, elapsed_ms: u64 },

    #[error("Unreadable entry {path}: {message}")]
    Unreadable { path: PathBuf, message: String },
}

/// A single non-empty line that could not become a block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: malformed JSON ({message})")]
    MalformedJson { line: usize, message: String },

    #[error("line {line}: record is not a JSON object")]
    NotAnObject { line: usize },

    #[error("line {line}: missing field `{field}`")]
    MissingField { line: usize, field: &'static str },

    #[error("line {line}: invalid timestamp `{value}`")]
    InvalidTimestamp { line: usize, value: String },
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            ParseError::MalformedJson { line, .. }
            | ParseError::NotAnObject { line }
            | ParseError::MissingField { line, .. }
            | ParseError::InvalidTimestamp { line, .. } => *line,
        }
    }
}

/// A file excluded from a batch, with the reason.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: ScopeError,
}

impl std::fmt::Display for FileFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}
