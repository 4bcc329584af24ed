//! # sessionscope - search for conversation session logs
//!
//! Scans a directory tree of JSONL conversation logs, parses them concurrently into an
//! immutable in-memory store and ranks blocks against synonym-expanded queries.
//!
//! ## Architecture
//!
//! - [`scan`] - bounded, cycle-safe discovery of candidate log files
//! - [`parse`] - streaming, failure-isolating record parsing
//! - [`store`] - the recency-ordered [`SessionStore`]
//! - [`search`] - query expansion and relevance scoring
//! - [`loader`] - scan + parse + index, and the background worker that runs it
//! - [`input`] and [`render`] - the interactive browser
//! - [`app`] - wiring for the terminal application

pub mod config;
pub mod error;
pub mod model;

pub mod loader;
pub mod parse;
pub mod scan;
pub mod search;
pub mod store;

pub mod input;
pub mod render;

pub mod app;

pub use app::Application;
pub use config::Config;
pub use error::{Result, ScopeError};
pub use search::SearchEngine;
pub use store::SessionStore;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
