//! Discovery of candidate log files under a root directory.
//!
//! The walk is bounded by depth and wall-clock time, tolerates unreadable subtrees and
//! never follows the same directory twice. Problems are reported as [`ScanError`]
//! warnings next to whatever was found.
//!
//! [`ScanError`]: crate::error::ScanError

pub mod recency;
pub mod walker;

pub use recency::{parse_window, window_start, RecencyWindow};
pub use walker::{ScanOutcome, ScanProgress, Scanner};
