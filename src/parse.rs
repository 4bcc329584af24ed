//! Streaming, failure-isolating parser for JSONL conversation logs.
//!
//! - [`record`] turns one line into a [`Block`](crate::model::Block) or a line error.
//! - [`session_parser`] streams one file into a [`Session`](crate::model::Session).
//! - [`batch`] parses many files on a bounded pool and isolates per-file failures.

pub mod batch;
pub mod record;
pub mod session_parser;

pub use batch::{BatchOutcome, BatchStats, ParseProgress};
pub use record::decode_line;
pub use session_parser::SessionParser;
