//! Terminal rendering: view state, styling and the ratatui-backed renderer.

pub mod renderer;
pub mod state;
pub mod terminal;
pub mod theme;

pub use renderer::Screen;
pub use state::{DisplayMode, StatusLine, ViewState};
pub use terminal::TerminalUI;
pub use theme::ColorTheme;

#[cfg(test)]
pub use renderer::tests::{DrawnFrame, RecordingScreen};
