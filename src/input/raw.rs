//! Terminal event collection.
//!
//! Polls crossterm, folds bursts of mouse-wheel ticks into one detail-pane scroll and
//! queues everything else untouched for the key state machine.

use crate::error::Result;
use crate::input::ScrollDirection;
use ratatui::crossterm::event::{self, Event, KeyEvent, MouseEventKind};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const WHEEL_WINDOW_MS: u64 = 12;
/// Detail lines moved by one wheel tick.
pub const WHEEL_LINES: u16 = 3;
const IDLE_POLL_MS: u64 = 50;

#[derive(Debug, Clone, PartialEq)]
pub enum RawInputEvent {
    Key(KeyEvent),
    Resize { width: u16, height: u16 },
    Wheel { direction: ScrollDirection, lines: u16 },
}

/// Accumulates same-direction wheel ticks until the window lapses or the direction flips.
#[derive(Debug, Clone)]
pub struct WheelCoalescer {
    window: Duration,
    pending: Option<(ScrollDirection, u16, Instant)>,
}

impl WheelCoalescer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Record a tick. A direction change hands back the previous burst.
    pub fn push(
        &mut self,
        direction: ScrollDirection,
        lines: u16,
        now: Instant,
    ) -> Option<(ScrollDirection, u16)> {
        match self.pending.as_mut() {
            Some((dir, total, last)) if *dir == direction => {
                *total = total.saturating_add(lines);
                *last = now;
                None
            }
            _ => {
                let previous = self.take();
                self.pending = Some((direction, lines, now));
                previous
            }
        }
    }

    pub fn take_if_stale(&mut self, now: Instant) -> Option<(ScrollDirection, u16)> {
        match self.pending {
            Some((_, _, last)) if now.duration_since(last) >= self.window => self.take(),
            _ => None,
        }
    }

    pub fn take(&mut self) -> Option<(ScrollDirection, u16)> {
        self.pending.take().map(|(dir, lines, _)| (dir, lines))
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
    }
}

impl Default for WheelCoalescer {
    fn default() -> Self {
        Self::new(Duration::from_millis(WHEEL_WINDOW_MS))
    }
}

/// Queue of terminal events waiting for the state machine.
#[derive(Debug, Default)]
pub struct RawInputCollector {
    wheel: WheelCoalescer,
    queue: VecDeque<RawInputEvent>,
}

impl RawInputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            wheel: WheelCoalescer::new(window),
            queue: VecDeque::new(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.wheel.is_empty()
    }

    /// Feed an event without touching the terminal.
    pub fn push_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => {
                self.flush_wheel();
                self.queue.push_back(RawInputEvent::Key(key));
            }
            Event::Resize(width, height) => {
                self.flush_wheel();
                self.queue.push_back(RawInputEvent::Resize { width, height });
            }
            Event::Mouse(mouse) => {
                let direction = match mouse.kind {
                    MouseEventKind::ScrollUp => ScrollDirection::Up,
                    MouseEventKind::ScrollDown => ScrollDirection::Down,
                    _ => return,
                };
                if let Some((direction, lines)) =
                    self.wheel.push(direction, WHEEL_LINES, Instant::now())
                {
                    self.queue
                        .push_back(RawInputEvent::Wheel { direction, lines });
                }
            }
            _ => {}
        }
    }

    /// Next queued event, or a wheel burst whose window has lapsed.
    pub fn next_ready(&mut self) -> Option<RawInputEvent> {
        if let Some(event) = self.queue.pop_front() {
            return Some(event);
        }
        self.wheel
            .take_if_stale(Instant::now())
            .map(|(direction, lines)| RawInputEvent::Wheel { direction, lines })
    }

    /// Block up to `timeout` for the next event.
    pub fn poll_event(&mut self, timeout: Option<Duration>) -> Result<Option<RawInputEvent>> {
        if let Some(event) = self.next_ready() {
            return Ok(Some(event));
        }

        let timeout = if self.wheel.is_empty() {
            timeout.unwrap_or(Duration::from_millis(IDLE_POLL_MS))
        } else {
            Duration::from_millis(WHEEL_WINDOW_MS)
        };

        if event::poll(timeout)? {
            self.push_event(event::read()?);
        }
        Ok(self.next_ready())
    }

    fn flush_wheel(&mut self) {
        if let Some((direction, lines)) = self.wheel.take() {
            self.queue
                .push_back(RawInputEvent::Wheel { direction, lines });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers, MouseEvent};

    fn wheel(kind: MouseEventKind) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn same_direction_ticks_merge() {
        let mut coalescer = WheelCoalescer::new(Duration::from_millis(10));
        let start = Instant::now();
        assert!(coalescer.push(ScrollDirection::Down, 3, start).is_none());
        assert!(coalescer
            .push(ScrollDirection::Down, 3, start + Duration::from_millis(4))
            .is_none());

        assert!(coalescer
            .take_if_stale(start + Duration::from_millis(8))
            .is_none());
        assert_eq!(
            coalescer.take_if_stale(start + Duration::from_millis(20)),
            Some((ScrollDirection::Down, 6))
        );
        assert!(coalescer.is_empty());
    }

    #[test]
    fn direction_flip_releases_previous_burst() {
        let mut coalescer = WheelCoalescer::default();
        let now = Instant::now();
        coalescer.push(ScrollDirection::Up, 3, now);
        assert_eq!(
            coalescer.push(ScrollDirection::Down, 3, now),
            Some((ScrollDirection::Up, 3))
        );
        assert_eq!(coalescer.take(), Some((ScrollDirection::Down, 3)));
    }

    #[test]
    fn key_press_flushes_wheel_first() {
        let mut collector = RawInputCollector::new();
        collector.push_event(wheel(MouseEventKind::ScrollDown));
        collector.push_event(Event::Key(KeyEvent::new(
            KeyCode::Char('j'),
            KeyModifiers::NONE,
        )));

        assert_eq!(
            collector.next_ready(),
            Some(RawInputEvent::Wheel {
                direction: ScrollDirection::Down,
                lines: WHEEL_LINES
            })
        );
        assert!(matches!(
            collector.next_ready(),
            Some(RawInputEvent::Key(key)) if key.code == KeyCode::Char('j')
        ));
        assert!(collector.is_idle());
    }

    #[test]
    fn resize_is_queued_after_pending_scroll() {
        let mut collector = RawInputCollector::with_window(Duration::from_secs(60));
        collector.push_event(wheel(MouseEventKind::ScrollUp));
        collector.push_event(Event::Resize(120, 40));

        assert!(matches!(
            collector.next_ready(),
            Some(RawInputEvent::Wheel {
                direction: ScrollDirection::Up,
                ..
            })
        ));
        assert_eq!(
            collector.next_ready(),
            Some(RawInputEvent::Resize {
                width: 120,
                height: 40
            })
        );
    }

    #[test]
    fn other_mouse_events_are_ignored() {
        let mut collector = RawInputCollector::new();
        collector.push_event(wheel(MouseEventKind::Moved));
        assert!(collector.is_idle());
    }
}
