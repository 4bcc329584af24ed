//! Keyboard and mouse handling.
//!
//! `raw` turns terminal events into a coalesced queue; `service` maps that queue onto
//! [`InputAction`]s through the browsing/searching state machine.

pub mod raw;
pub mod service;

pub use service::{InputAction, InputService, InputState, InputStateMachine, BIG_STEP, SINGLE_STEP};

/// Direction shared by list movement and detail scrolling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}
