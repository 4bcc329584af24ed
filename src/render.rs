//! Render coordination: the protocol spoken with the load worker, the action handler
//! that mutates view state, and the terminal UI itself.

pub mod protocol;
pub mod service;
pub mod ui;

pub use service::RenderLoopState;
