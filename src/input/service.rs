//! Key bindings and the browsing/searching state machine.
//!
//! The service drains the raw collector, runs each event through the state machine and
//! yields the resulting [`InputAction`]s for the render coordinator.

use crate::error::Result;
use crate::input::raw::{RawInputCollector, RawInputEvent};
use crate::input::ScrollDirection;
use ratatui::crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

/// Rows moved by `j`/`k` and the arrow keys.
pub const SINGLE_STEP: usize = 1;
/// Rows moved by `J`/`K` and the page keys.
pub const BIG_STEP: usize = 10;
/// Detail lines moved by Ctrl-d / Ctrl-u.
const DETAIL_PAGE: u16 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    Browsing,
    Searching,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputAction {
    Move {
        direction: ScrollDirection,
        step: usize,
    },
    GoToStart,
    GoToEnd,
    ScrollDetail {
        direction: ScrollDirection,
        lines: u16,
    },
    StartSearch,
    UpdateSearchBuffer(String),
    CommitSearch(String),
    CancelSearch,
    /// Drop the active result set and return to the plain session list.
    ClearSearch,
    NextMatch,
    PreviousMatch,
    CycleDisplayMode,
    CycleRecency,
    Reload,
    Quit,
    Resize {
        width: u16,
        height: u16,
    },
    NoAction,
    InvalidInput,
}

fn is_plain(modifiers: KeyModifiers) -> bool {
    !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}

pub struct InputStateMachine {
    state: InputState,
    search_buffer: String,
}

impl InputStateMachine {
    pub fn new() -> Self {
        Self {
            state: InputState::Browsing,
            search_buffer: String::new(),
        }
    }

    pub fn handle_key_event(&mut self, key_event: KeyEvent) -> InputAction {
        if key_event.kind != KeyEventKind::Press {
            return InputAction::NoAction;
        }

        match self.state {
            InputState::Browsing => self.browse(key_event.code, key_event.modifiers),
            InputState::Searching => self.edit_search(key_event.code, key_event.modifiers),
        }
    }

    fn browse(&mut self, code: KeyCode, modifiers: KeyModifiers) -> InputAction {
        use ScrollDirection::{Down, Up};

        match (code, modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => InputAction::Quit,
            (KeyCode::Char('d'), KeyModifiers::CONTROL) => InputAction::ScrollDetail {
                direction: Down,
                lines: DETAIL_PAGE,
            },
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => InputAction::ScrollDetail {
                direction: Up,
                lines: DETAIL_PAGE,
            },
            (KeyCode::Down, _) => move_by(Down, SINGLE_STEP),
            (KeyCode::Up, _) => move_by(Up, SINGLE_STEP),
            (KeyCode::PageDown, _) => move_by(Down, BIG_STEP),
            (KeyCode::PageUp, _) => move_by(Up, BIG_STEP),
            (KeyCode::Home, _) => InputAction::GoToStart,
            (KeyCode::End, _) => InputAction::GoToEnd,
            (KeyCode::Tab, _) => InputAction::CycleDisplayMode,
            (KeyCode::Esc, _) => InputAction::ClearSearch,
            (KeyCode::Char(ch), modifiers) if is_plain(modifiers) => match ch {
                'j' => move_by(Down, SINGLE_STEP),
                'k' => move_by(Up, SINGLE_STEP),
                'J' => move_by(Down, BIG_STEP),
                'K' => move_by(Up, BIG_STEP),
                'g' => InputAction::GoToStart,
                'G' => InputAction::GoToEnd,
                'n' => InputAction::NextMatch,
                'p' | 'N' => InputAction::PreviousMatch,
                'v' => InputAction::CycleDisplayMode,
                't' => InputAction::CycleRecency,
                'R' => InputAction::Reload,
                'q' => InputAction::Quit,
                '/' => {
                    self.state = InputState::Searching;
                    self.search_buffer.clear();
                    InputAction::StartSearch
                }
                _ => InputAction::InvalidInput,
            },
            _ => InputAction::InvalidInput,
        }
    }

    fn edit_search(&mut self, code: KeyCode, modifiers: KeyModifiers) -> InputAction {
        match (code, modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) | (KeyCode::Esc, _) => {
                self.leave_search();
                InputAction::CancelSearch
            }
            (KeyCode::Char(ch), modifiers) if is_plain(modifiers) && !ch.is_control() => {
                self.search_buffer.push(ch);
                InputAction::UpdateSearchBuffer(self.search_buffer.clone())
            }
            (KeyCode::Backspace, _) => {
                self.search_buffer.pop();
                InputAction::UpdateSearchBuffer(self.search_buffer.clone())
            }
            (KeyCode::Enter, _) => {
                let query = std::mem::take(&mut self.search_buffer);
                self.state = InputState::Browsing;
                if query.trim().is_empty() {
                    InputAction::CancelSearch
                } else {
                    InputAction::CommitSearch(query)
                }
            }
            _ => InputAction::NoAction,
        }
    }

    fn leave_search(&mut self) {
        self.state = InputState::Browsing;
        self.search_buffer.clear();
    }

    pub fn search_buffer(&self) -> &str {
        &self.search_buffer
    }

    pub fn state(&self) -> InputState {
        self.state
    }
}

impl Default for InputStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

fn move_by(direction: ScrollDirection, step: usize) -> InputAction {
    InputAction::Move { direction, step }
}

/// Produces [`InputAction`]s from terminal events.
pub struct InputService {
    state_machine: InputStateMachine,
    raw_input: RawInputCollector,
}

impl InputService {
    pub fn new() -> Self {
        Self {
            state_machine: InputStateMachine::new(),
            raw_input: RawInputCollector::new(),
        }
    }

    pub fn poll_actions(&mut self, timeout: Option<Duration>) -> Result<Vec<InputAction>> {
        let mut actions = Vec::new();
        if let Some(first) = self.raw_input.poll_event(timeout)? {
            actions.extend(self.process_raw_event(first));
            while let Some(next) = self.raw_input.next_ready() {
                actions.extend(self.process_raw_event(next));
            }
        }
        Ok(actions)
    }

    /// Push a synthetic event and drain whatever became ready.
    pub fn process_event(&mut self, event: Event) -> Vec<InputAction> {
        self.raw_input.push_event(event);
        let mut actions = Vec::new();
        while let Some(raw) = self.raw_input.next_ready() {
            actions.extend(self.process_raw_event(raw));
        }
        actions
    }

    pub fn state(&self) -> InputState {
        self.state_machine.state()
    }

    fn process_raw_event(&mut self, event: RawInputEvent) -> Option<InputAction> {
        let action = match event {
            RawInputEvent::Key(key_event) => self.state_machine.handle_key_event(key_event),
            RawInputEvent::Resize { width, height } => InputAction::Resize { width, height },
            RawInputEvent::Wheel { direction, lines } => {
                InputAction::ScrollDetail { direction, lines }
            }
        };

        match action {
            InputAction::NoAction | InputAction::InvalidInput => None,
            _ => Some(action),
        }
    }
}

impl Default for InputService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::{KeyEventState, MouseEvent, MouseEventKind};

    fn press(machine: &mut InputStateMachine, code: KeyCode) -> InputAction {
        machine.handle_key_event(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(machine: &mut InputStateMachine, ch: char) -> InputAction {
        machine.handle_key_event(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL))
    }

    fn type_str(machine: &mut InputStateMachine, text: &str) {
        for ch in text.chars() {
            press(machine, KeyCode::Char(ch));
        }
    }

    #[test]
    fn small_and_big_steps_share_one_action() {
        let mut machine = InputStateMachine::new();
        assert_eq!(
            press(&mut machine, KeyCode::Char('j')),
            move_by(ScrollDirection::Down, 1)
        );
        assert_eq!(
            press(&mut machine, KeyCode::Up),
            move_by(ScrollDirection::Up, 1)
        );
        assert_eq!(
            press(&mut machine, KeyCode::Char('J')),
            move_by(ScrollDirection::Down, BIG_STEP)
        );
        assert_eq!(
            press(&mut machine, KeyCode::PageUp),
            move_by(ScrollDirection::Up, BIG_STEP)
        );
    }

    #[test]
    fn browsing_bindings() {
        let mut machine = InputStateMachine::new();
        assert_eq!(press(&mut machine, KeyCode::Char('n')), InputAction::NextMatch);
        assert_eq!(press(&mut machine, KeyCode::Char('p')), InputAction::PreviousMatch);
        assert_eq!(press(&mut machine, KeyCode::Char('N')), InputAction::PreviousMatch);
        assert_eq!(press(&mut machine, KeyCode::Tab), InputAction::CycleDisplayMode);
        assert_eq!(press(&mut machine, KeyCode::Char('t')), InputAction::CycleRecency);
        assert_eq!(press(&mut machine, KeyCode::Char('R')), InputAction::Reload);
        assert_eq!(press(&mut machine, KeyCode::Esc), InputAction::ClearSearch);
        assert_eq!(press(&mut machine, KeyCode::Char('G')), InputAction::GoToEnd);
        assert_eq!(
            ctrl(&mut machine, 'd'),
            InputAction::ScrollDetail {
                direction: ScrollDirection::Down,
                lines: DETAIL_PAGE
            }
        );
        assert_eq!(ctrl(&mut machine, 'c'), InputAction::Quit);
        assert_eq!(press(&mut machine, KeyCode::Char('q')), InputAction::Quit);
    }

    #[test]
    fn search_mode_captures_navigation_keys() {
        let mut machine = InputStateMachine::new();
        assert_eq!(press(&mut machine, KeyCode::Char('/')), InputAction::StartSearch);
        assert_eq!(machine.state(), InputState::Searching);

        assert_eq!(
            press(&mut machine, KeyCode::Char('j')),
            InputAction::UpdateSearchBuffer("j".into())
        );
        type_str(&mut machine, "q n");
        assert_eq!(machine.search_buffer(), "jq n");
        assert_eq!(machine.state(), InputState::Searching);

        assert_eq!(
            press(&mut machine, KeyCode::Backspace),
            InputAction::UpdateSearchBuffer("jq ".into())
        );
        assert_eq!(
            press(&mut machine, KeyCode::Enter),
            InputAction::CommitSearch("jq ".into())
        );
        assert_eq!(machine.state(), InputState::Browsing);
        assert_eq!(machine.search_buffer(), "");
    }

    #[test]
    fn empty_commit_cancels() {
        let mut machine = InputStateMachine::new();
        press(&mut machine, KeyCode::Char('/'));
        type_str(&mut machine, "  ");
        assert_eq!(press(&mut machine, KeyCode::Enter), InputAction::CancelSearch);
        assert_eq!(machine.state(), InputState::Browsing);
    }

    #[test]
    fn escape_and_ctrl_c_cancel_search() {
        let mut machine = InputStateMachine::new();
        press(&mut machine, KeyCode::Char('/'));
        type_str(&mut machine, "auth");
        assert_eq!(press(&mut machine, KeyCode::Esc), InputAction::CancelSearch);
        assert_eq!(machine.search_buffer(), "");

        press(&mut machine, KeyCode::Char('/'));
        assert_eq!(ctrl(&mut machine, 'c'), InputAction::CancelSearch);
        assert_eq!(machine.state(), InputState::Browsing);
    }

    #[test]
    fn release_events_are_ignored() {
        let mut machine = InputStateMachine::new();
        let release = KeyEvent {
            code: KeyCode::Char('j'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(machine.handle_key_event(release), InputAction::NoAction);
    }

    #[test]
    fn service_filters_invalid_keys_and_maps_wheel() {
        let mut service = InputService::new();
        assert!(service
            .process_event(Event::Key(KeyEvent::new(
                KeyCode::Char('z'),
                KeyModifiers::NONE
            )))
            .is_empty());

        assert!(service
            .process_event(Event::Mouse(MouseEvent {
                kind: MouseEventKind::ScrollDown,
                column: 0,
                row: 0,
                modifiers: KeyModifiers::NONE,
            }))
            .is_empty());
        let actions = service.process_event(Event::Resize(80, 24));
        assert_eq!(
            actions,
            vec![
                InputAction::ScrollDetail {
                    direction: ScrollDirection::Down,
                    lines: crate::input::raw::WHEEL_LINES,
                },
                InputAction::Resize {
                    width: 80,
                    height: 24
                },
            ]
        );
    }
}
