//! Application orchestration.
//!
//! Wires the input thread, the load worker and the renderer around one event loop. The
//! loop owns the [`ViewState`]; everything else talks to it over channels.

mod runtime;

use crate::config::Config;
use crate::error::Result;
use crate::input::InputAction;
use crate::loader::Loader;
use crate::render::protocol::LoadCommand;
use crate::render::ui::{Screen, ViewState};
use crate::render::RenderLoopState;
use crate::search::SearchEngine;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub use runtime::{spawn_input_thread, spawn_load_worker};

const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Redraw cadence while idle, so progress and resizes show up without input.
const TICK_INTERVAL: Duration = Duration::from_millis(100);
const LOAD_COMMAND_CAPACITY: usize = 4;
const LOAD_EVENT_CAPACITY: usize = 64;

pub struct Application {
    config: Config,
    root: PathBuf,
    modified_after: Option<DateTime<Utc>>,
    screen: Box<dyn Screen>,
}

impl Application {
    pub fn new(
        config: Config,
        root: PathBuf,
        modified_after: Option<DateTime<Utc>>,
        screen: Box<dyn Screen>,
    ) -> Self {
        Self {
            config,
            root,
            modified_after,
            screen,
        }
    }

    /// Take over the terminal and run until the user quits.
    pub async fn run(&mut self) -> Result<()> {
        self.screen.enter()?;

        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let input_thread =
            spawn_input_thread(input_tx, Arc::clone(&shutdown), INPUT_POLL_INTERVAL);

        let outcome = self.run_with_input(input_rx).await;

        shutdown.store(true, Ordering::SeqCst);
        let cleanup = self.screen.leave();
        if input_thread.join().is_err() {
            log::error!("input thread panicked");
        }
        outcome.and(cleanup)
    }

    /// Event loop fed by an arbitrary action source.
    pub async fn run_with_input(
        &mut self,
        mut input_rx: mpsc::UnboundedReceiver<InputAction>,
    ) -> Result<()> {
        let (width, height) = self.screen.size()?;
        let mut view_state = ViewState::new(&self.root, width, height);

        let (load_tx, load_rx) = mpsc::channel(LOAD_COMMAND_CAPACITY);
        let (event_tx, mut event_rx) = mpsc::channel(LOAD_EVENT_CAPACITY);
        let worker = spawn_load_worker(load_rx, event_tx, Loader::new(self.config.clone()));

        let mut render_state = RenderLoopState::new(
            SearchEngine::new(self.config.search.clone()),
            self.modified_after,
        );
        render_state.request_load(&mut view_state, &load_tx).await?;
        self.screen.draw(&view_state)?;

        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        let outcome = loop {
            tokio::select! {
                action = input_rx.recv() => {
                    let Some(action) = action else {
                        break Ok(());
                    };
                    match render_state.process_action(action, &mut view_state, &load_tx).await {
                        Ok(true) => {}
                        Ok(false) => break Ok(()),
                        Err(err) => break Err(err),
                    }
                }
                Some(event) = event_rx.recv() => {
                    render_state.handle_event(event, &mut view_state);
                }
                _ = ticker.tick() => {}
            }

            if let Err(err) = self.screen.draw(&view_state) {
                break Err(err);
            }
        };

        // An in-flight load would hold the worker past Shutdown; quitting does not wait for it.
        let _ = load_tx.try_send(LoadCommand::Shutdown);
        worker.abort();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::ui::RecordingScreen;
    use std::fs;

    fn app_for(root: PathBuf, screen: &RecordingScreen) -> Application {
        Application::new(Config::default(), root, None, Box::new(screen.clone()))
    }

    fn write_log(dir: &std::path::Path) {
        fs::write(
            dir.join("s.jsonl"),
            "{\"role\":\"user\",\"content\":\"hello\",\"timestamp\":\"2024-05-01T10:00:00Z\"}\n",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn quit_ends_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let screen = RecordingScreen::new(80, 24);
        let mut app = app_for(dir.path().to_path_buf(), &screen);
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(InputAction::Quit).unwrap();

        tokio::time::timeout(Duration::from_secs(5), app.run_with_input(rx))
            .await
            .unwrap()
            .unwrap();
        let first = &screen.frames()[0];
        assert!(first.loading);
        assert_eq!(first.sessions, 0);
    }

    #[tokio::test]
    async fn closed_input_ends_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        write_log(dir.path());
        let screen = RecordingScreen::new(80, 24);
        let mut app = app_for(dir.path().to_path_buf(), &screen);
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(InputAction::CommitSearch("hello".into())).unwrap();
        tx.send(InputAction::Move {
            direction: crate::input::ScrollDirection::Down,
            step: 1,
        })
        .unwrap();
        drop(tx);

        tokio::time::timeout(Duration::from_secs(5), app.run_with_input(rx))
            .await
            .unwrap()
            .unwrap();
        assert!(!screen.frames().is_empty());
    }

    #[tokio::test]
    async fn loaded_sessions_reach_the_screen() {
        let dir = tempfile::tempdir().unwrap();
        write_log(dir.path());
        let screen = RecordingScreen::new(80, 24);
        let mut app = app_for(dir.path().to_path_buf(), &screen);
        let (tx, rx) = mpsc::unbounded_channel();

        let quit_once_loaded = async {
            while !screen
                .last_frame()
                .is_some_and(|frame| !frame.loading && frame.sessions == 1)
            {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            tx.send(InputAction::Quit).unwrap();
        };
        let (outcome, ()) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(app.run_with_input(rx), quit_once_loaded)
        })
        .await
        .unwrap();
        outcome.unwrap();

        let frames = screen.frames();
        assert!(frames[0].loading);
        assert_eq!(frames.last().unwrap().query, None);
    }
}
