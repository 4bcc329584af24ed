//! Render coordination.
//!
//! Applies input actions to the view state, runs searches on the interaction path and
//! folds load worker events back in. Load responses carry the request id they answer;
//! anything but the latest request is dropped.

use crate::error::{Result, ScopeError};
use crate::input::InputAction;
use crate::render::protocol::{LoadCommand, LoadEvent, RequestId};
use crate::render::ui::ViewState;
use crate::search::SearchEngine;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

pub struct RenderLoopState {
    engine: SearchEngine,
    next_request_id: RequestId,
    pending_load: Option<RequestId>,
    /// Scan cutoff from the command line, applied to every load.
    modified_after: Option<DateTime<Utc>>,
}

impl RenderLoopState {
    pub fn new(engine: SearchEngine, modified_after: Option<DateTime<Utc>>) -> Self {
        Self {
            engine,
            next_request_id: 1,
            pending_load: None,
            modified_after,
        }
    }

    pub fn pending_load(&self) -> Option<RequestId> {
        self.pending_load
    }

    /// Ask the worker for a fresh load of the view's root and switch to the loading view.
    pub async fn request_load(
        &mut self,
        view_state: &mut ViewState,
        load_tx: &mpsc::Sender<LoadCommand>,
    ) -> Result<RequestId> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.pending_load = Some(request_id);
        view_state.loading = Some(None);

        load_tx
            .send(LoadCommand::Load {
                request_id,
                root: view_state.root.clone(),
                modified_after: self.modified_after,
            })
            .await
            .map_err(|_| ScopeError::other("load worker unavailable"))?;
        Ok(request_id)
    }

    /// Returns `Ok(false)` when the application should exit.
    pub async fn process_action(
        &mut self,
        action: InputAction,
        view_state: &mut ViewState,
        load_tx: &mpsc::Sender<LoadCommand>,
    ) -> Result<bool> {
        match action {
            InputAction::Quit => return Ok(false),
            InputAction::Move { direction, step } => view_state.move_selection(direction, step),
            InputAction::GoToStart => view_state.go_to_start(),
            InputAction::GoToEnd => view_state.go_to_end(),
            InputAction::ScrollDetail { direction, lines } => {
                view_state.scroll_detail(direction, lines)
            }
            InputAction::StartSearch => {
                view_state.status_line.clear_message();
                view_state.status_line.set_search_prompt();
            }
            InputAction::UpdateSearchBuffer(buffer) => {
                view_state.status_line.update_search_prompt(buffer)
            }
            InputAction::CommitSearch(query) => {
                view_state.status_line.clear_search_prompt();
                view_state.active_query = Some(query.trim().to_string());
                self.run_active_query(view_state);
            }
            InputAction::CancelSearch | InputAction::ClearSearch => {
                view_state.status_line.clear_search_prompt();
                view_state.status_line.clear_message();
                view_state.clear_results();
            }
            InputAction::NextMatch => step_match(view_state, true),
            InputAction::PreviousMatch => step_match(view_state, false),
            InputAction::CycleDisplayMode => {
                view_state.cycle_display_mode();
            }
            InputAction::CycleRecency => {
                let window = view_state.cycle_recency(Utc::now());
                view_state.status_line.set_message(format!(
                    "window {}: {} sessions",
                    window.label(),
                    view_state.store().len()
                ));
                self.run_active_query(view_state);
            }
            InputAction::Reload => {
                if self.pending_load.is_some() {
                    view_state.status_line.set_message("Load already running");
                } else {
                    self.request_load(view_state, load_tx).await?;
                }
            }
            InputAction::Resize { width, height } => {
                view_state.update_terminal_size(width, height);
            }
            InputAction::NoAction | InputAction::InvalidInput => {}
        }
        Ok(true)
    }

    pub fn handle_event(&mut self, event: LoadEvent, view_state: &mut ViewState) {
        if Some(event.request_id()) != self.pending_load {
            log::debug!("dropping stale load event {}", event.request_id());
            return;
        }

        match event {
            LoadEvent::Progress { progress, .. } => view_state.loading = Some(Some(progress)),
            LoadEvent::Loaded { store, report, .. } => {
                self.pending_load = None;
                let summary = report.summary(store.len());
                log::info!("load complete: {summary}");
                for failure in &report.failures {
                    log::warn!("{failure}");
                }
                view_state.install_store(store, Utc::now());
                view_state.status_line.set_message(summary.clone());
                view_state.load_summary = Some(summary);
                self.run_active_query(view_state);
            }
            LoadEvent::Failed { error, .. } => {
                self.pending_load = None;
                view_state.loading = None;
                view_state
                    .status_line
                    .set_message(format!("Load failed: {error}"));
            }
        }
    }

    /// Re-run the committed query, if any, against the store currently shown.
    fn run_active_query(&self, view_state: &mut ViewState) {
        let Some(query) = view_state.active_query.clone() else {
            return;
        };
        let results = self.engine.search(&query, view_state.store());
        let message = if results.is_empty() {
            format!("No matches for {query}")
        } else {
            format!(
                "{} matches in {} sessions ({} ms)",
                results.len(),
                results.session_order.len(),
                results.elapsed.as_millis()
            )
        };
        view_state.apply_results(results);
        view_state.status_line.set_message(message);
    }
}

fn step_match(view_state: &mut ViewState, forward: bool) {
    if !view_state.step_match(forward) {
        view_state.status_line.set_message("No active search");
    }
}
