//! The seam between the event loop and whatever shows the browser.

use crate::error::Result;
use crate::render::ui::state::ViewState;

/// Something the browser can be drawn on. The terminal in production, a recorder in tests.
pub trait Screen {
    /// Switch the terminal into the browser (raw mode, alternate screen).
    fn enter(&mut self) -> Result<()>;

    /// Restore the terminal. Calling it twice is harmless.
    fn leave(&mut self) -> Result<()>;

    /// Columns and rows available to the browser.
    fn size(&self) -> Result<(u16, u16)>;

    fn draw(&mut self, view_state: &ViewState) -> Result<()>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::render::ui::state::DisplayMode;
    use std::sync::{Arc, Mutex};

    /// What one drawn frame showed.
    #[derive(Debug, Clone, PartialEq)]
    pub struct DrawnFrame {
        pub mode: DisplayMode,
        pub loading: bool,
        pub sessions: usize,
        pub query: Option<String>,
        pub current_match: Option<usize>,
        pub status: String,
    }

    /// Keeps every frame it is asked to draw. Clones share the log, so a test can hold
    /// one clone while the application owns another.
    #[derive(Clone)]
    pub struct RecordingScreen {
        frames: Arc<Mutex<Vec<DrawnFrame>>>,
        size: (u16, u16),
        entered: bool,
    }

    impl RecordingScreen {
        pub fn new(width: u16, height: u16) -> Self {
            Self {
                frames: Arc::default(),
                size: (width, height),
                entered: false,
            }
        }

        pub fn frames(&self) -> Vec<DrawnFrame> {
            self.frames.lock().unwrap().clone()
        }

        pub fn last_frame(&self) -> Option<DrawnFrame> {
            self.frames.lock().unwrap().last().cloned()
        }
    }

    impl Screen for RecordingScreen {
        fn enter(&mut self) -> Result<()> {
            self.entered = true;
            Ok(())
        }

        fn leave(&mut self) -> Result<()> {
            self.entered = false;
            Ok(())
        }

        fn size(&self) -> Result<(u16, u16)> {
            Ok(self.size)
        }

        fn draw(&mut self, view_state: &ViewState) -> Result<()> {
            self.frames.lock().unwrap().push(DrawnFrame {
                mode: view_state.display_mode,
                loading: view_state.is_loading(),
                sessions: view_state.store().len(),
                query: view_state.active_query.clone(),
                current_match: view_state.current_match(),
                status: view_state.format_status_line(),
            });
            Ok(())
        }
    }

    #[test]
    fn records_what_each_frame_showed() {
        let mut screen = RecordingScreen::new(100, 30);
        let log = screen.clone();
        let mut view_state = ViewState::new("/logs", 100, 30);

        screen.enter().unwrap();
        assert!(screen.entered);
        screen.draw(&view_state).unwrap();
        view_state.cycle_display_mode();
        screen.draw(&view_state).unwrap();
        screen.leave().unwrap();
        assert!(!screen.entered);

        let frames = log.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].mode, DisplayMode::Summary);
        assert_eq!(frames[0].status, "summary | all | empty");
        assert_eq!(frames[0].sessions, 0);
        assert_eq!(frames[0].query, None);
        assert_ne!(frames[1].mode, DisplayMode::Summary);
        assert_eq!(log.size().unwrap(), (100, 30));
    }
}
