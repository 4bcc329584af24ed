//! View state for the session browser.
//!
//! Holds the store being shown, the active result set and every cursor the renderer
//! needs. Search itself happens in the render coordinator; this module only reacts to
//! results and navigation.

use crate::input::ScrollDirection;
use crate::loader::LoadProgress;
use crate::model::{Block, Session};
use crate::scan::RecencyWindow;
use crate::search::{SearchMatch, SearchResults};
use crate::store::SessionStore;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What the main pane shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Session list with per-session insights.
    #[default]
    Summary,
    /// Session list with the full transcript of the selection.
    FullDetail,
    /// One row per ranked match.
    ResultBrowser,
}

impl DisplayMode {
    pub fn next(self) -> Self {
        match self {
            DisplayMode::Summary => DisplayMode::FullDetail,
            DisplayMode::FullDetail => DisplayMode::ResultBrowser,
            DisplayMode::ResultBrowser => DisplayMode::Summary,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DisplayMode::Summary => "summary",
            DisplayMode::FullDetail => "detail",
            DisplayMode::ResultBrowser => "results",
        }
    }
}

/// Move `current` by `step` within `0..len`, clamping at both ends.
pub fn step_index(current: usize, direction: ScrollDirection, step: usize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let last = len - 1;
    match direction {
        ScrollDirection::Up => current.min(last).saturating_sub(step),
        ScrollDirection::Down => current.saturating_add(step).min(last),
    }
}

/// Lines a block occupies in the transcript: heading, body lines, then a blank separator.
pub fn transcript_rows(block: &Block) -> usize {
    let text = block.text();
    let body = memchr::memchr_iter(b'\n', text.as_bytes()).count()
        + usize::from(!text.is_empty() && !text.ends_with('\n'));
    body + 2
}

/// First transcript line of block `block_index`.
pub fn transcript_offset(session: &Session, block_index: usize) -> usize {
    session.blocks.iter().take(block_index).map(transcript_rows).sum()
}

/// Block holding transcript line `line`, and how many of its lines come before it.
pub fn locate_transcript_line(session: &Session, line: usize) -> Option<(usize, usize)> {
    let mut start = 0;
    for (index, block) in session.blocks.iter().enumerate() {
        let rows = transcript_rows(block);
        if line < start + rows {
            return Some((index, line - start));
        }
        start += rows;
    }
    None
}

#[derive(Debug)]
pub struct ViewState {
    pub root: PathBuf,
    base_store: Arc<SessionStore>,
    store: Arc<SessionStore>,
    pub recency: RecencyWindow,
    /// Committed query, kept so recency changes and reloads can re-run it.
    pub active_query: Option<String>,
    results: Option<SearchResults>,
    pub display_mode: DisplayMode,
    selected: usize,
    current_match: Option<usize>,
    /// First line of the detail pane. In FullDetail this counts transcript lines.
    pub detail_scroll: usize,
    pub status_line: StatusLine,
    /// `Some` while a load is in flight; the inner value is the latest progress seen.
    pub loading: Option<Option<LoadProgress>>,
    pub load_summary: Option<String>,
    pub viewport_width: u16,
    pub viewport_height: u16,
}

impl ViewState {
    pub fn new(root: impl AsRef<Path>, viewport_width: u16, viewport_height: u16) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            base_store: Arc::default(),
            store: Arc::default(),
            recency: RecencyWindow::All,
            active_query: None,
            results: None,
            display_mode: DisplayMode::Summary,
            selected: 0,
            current_match: None,
            detail_scroll: 0,
            status_line: StatusLine::new(),
            loading: None,
            load_summary: None,
            viewport_width,
            viewport_height,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn results(&self) -> Option<&SearchResults> {
        self.results.as_ref()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn current_match(&self) -> Option<usize> {
        self.current_match
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    /// Swap in a freshly loaded store and re-apply the recency window.
    pub fn install_store(&mut self, store: Arc<SessionStore>, now: DateTime<Utc>) {
        self.base_store = store;
        self.loading = None;
        self.apply_recency(now);
    }

    pub fn cycle_recency(&mut self, now: DateTime<Utc>) -> RecencyWindow {
        self.recency = self.recency.next();
        self.apply_recency(now);
        self.recency
    }

    fn apply_recency(&mut self, now: DateTime<Utc>) {
        self.store = match self.recency.cutoff(now) {
            None => Arc::clone(&self.base_store),
            Some(cutoff) => Arc::new(self.base_store.filter_recent(Some(cutoff))),
        };
        self.results = None;
        self.current_match = None;
        self.selected = 0;
        self.detail_scroll = 0;
    }

    /// Replace the working result set and put the selection on the top match.
    pub fn apply_results(&mut self, results: SearchResults) {
        self.current_match = if results.is_empty() { None } else { Some(0) };
        self.results = Some(results);
        self.selected = 0;
        self.reveal_current_match();
    }

    /// Drop the result set and show the unfiltered store order again.
    pub fn clear_results(&mut self) {
        let keep = self.selected_session_index();
        self.results = None;
        self.active_query = None;
        self.current_match = None;
        self.selected = keep.unwrap_or(0);
        self.detail_scroll = 0;
        if self.display_mode == DisplayMode::ResultBrowser {
            self.display_mode = DisplayMode::Summary;
        }
    }

    /// Store indices in the order the session list shows them.
    pub fn visible_sessions(&self) -> Vec<usize> {
        match &self.results {
            Some(results) => results.session_order.clone(),
            None => (0..self.store.len()).collect(),
        }
    }

    /// Rows in the list pane for the current display mode.
    pub fn list_len(&self) -> usize {
        match (&self.results, self.display_mode) {
            (Some(results), DisplayMode::ResultBrowser) => results.len(),
            (Some(results), _) => results.session_order.len(),
            (None, DisplayMode::ResultBrowser) => 0,
            (None, _) => self.store.len(),
        }
    }

    /// Single entry point for every list movement, small or big.
    pub fn move_selection(&mut self, direction: ScrollDirection, step: usize) {
        let next = step_index(self.selected, direction, step, self.list_len());
        if next != self.selected {
            self.detail_scroll = 0;
        }
        self.selected = next;
        if self.display_mode == DisplayMode::ResultBrowser && self.list_len() > 0 {
            self.current_match = Some(self.selected);
        }
    }

    pub fn go_to_start(&mut self) {
        self.move_selection(ScrollDirection::Up, usize::MAX);
    }

    pub fn go_to_end(&mut self) {
        self.move_selection(ScrollDirection::Down, usize::MAX);
    }

    /// Walk the ranked matches, wrapping at both ends. Returns false without results.
    pub fn step_match(&mut self, forward: bool) -> bool {
        let total = match &self.results {
            Some(results) if !results.is_empty() => results.len(),
            _ => return false,
        };
        let next = match self.current_match {
            None => 0,
            Some(current) if forward => (current + 1) % total,
            Some(current) => (current + total - 1) % total,
        };
        self.current_match = Some(next);
        self.sync_selection_to_match();
        true
    }

    fn sync_selection_to_match(&mut self) {
        let Some(current) = self.current_match else {
            return;
        };
        if self.display_mode == DisplayMode::ResultBrowser {
            self.selected = current;
            self.detail_scroll = 0;
            return;
        }
        let session_index = self
            .results
            .as_ref()
            .and_then(|r| r.matches.get(current))
            .map(|m| m.session_index);
        if let Some(row) = session_index
            .and_then(|idx| self.visible_sessions().iter().position(|&s| s == idx))
        {
            self.selected = row;
        }
        self.reveal_current_match();
    }

    /// In FullDetail, scroll the transcript to the block of the current match.
    fn reveal_current_match(&mut self) {
        if self.display_mode != DisplayMode::FullDetail {
            self.detail_scroll = 0;
            return;
        }
        let selected = self.selected_session_index();
        self.detail_scroll = match (self.selected_match(), self.selected_session()) {
            (Some(m), Some(session)) if selected == Some(m.session_index) => {
                transcript_offset(session, m.block_index)
            }
            _ => 0,
        };
    }

    pub fn cycle_display_mode(&mut self) -> DisplayMode {
        let previous = self.display_mode;
        self.display_mode = previous.next();
        if self.display_mode == DisplayMode::ResultBrowser {
            self.selected = self.current_match.unwrap_or(0);
        } else if previous == DisplayMode::ResultBrowser {
            self.sync_selection_to_match();
            self.selected = self.selected.min(self.list_len().saturating_sub(1));
        }
        self.reveal_current_match();
        self.display_mode
    }

    pub fn scroll_detail(&mut self, direction: ScrollDirection, lines: u16) {
        let lines = usize::from(lines);
        let scroll = match direction {
            ScrollDirection::Up => self.detail_scroll.saturating_sub(lines),
            ScrollDirection::Down => self.detail_scroll.saturating_add(lines),
        };
        self.detail_scroll = match (self.display_mode, self.selected_session()) {
            (DisplayMode::FullDetail, Some(session)) => {
                let total = transcript_offset(session, session.blocks.len());
                scroll.min(total.saturating_sub(1))
            }
            _ => scroll,
        };
    }

    pub fn selected_match(&self) -> Option<&SearchMatch> {
        let results = self.results.as_ref()?;
        match self.display_mode {
            DisplayMode::ResultBrowser => results.matches.get(self.selected),
            _ => results.matches.get(self.current_match?),
        }
    }

    /// Store index of the session under the cursor.
    pub fn selected_session_index(&self) -> Option<usize> {
        match (&self.results, self.display_mode) {
            (Some(results), DisplayMode::ResultBrowser) => {
                results.matches.get(self.selected).map(|m| m.session_index)
            }
            (Some(results), _) => results.session_order.get(self.selected).copied(),
            (None, DisplayMode::ResultBrowser) => None,
            (None, _) => (self.selected < self.store.len()).then_some(self.selected),
        }
    }

    pub fn selected_session(&self) -> Option<&Arc<Session>> {
        self.selected_session_index()
            .and_then(|idx| self.store.get(idx))
    }

    /// Returns true if the dimensions changed.
    pub fn update_terminal_size(&mut self, width: u16, height: u16) -> bool {
        let changed = self.viewport_width != width || self.viewport_height != height;
        if changed {
            self.viewport_width = width;
            self.viewport_height = height;
        }
        changed
    }

    pub fn format_status_line(&self) -> String {
        let position = match self.list_len() {
            0 => "empty".to_string(),
            len => format!("{}/{}", self.selected + 1, len),
        };
        let matches = self.results.as_ref().map(|results| {
            let current = self.current_match.map(|c| c + 1).unwrap_or(0);
            format!("match {}/{}", current, results.len())
        });
        self.status_line.format_status_line(
            self.display_mode,
            self.recency,
            &position,
            matches.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatusLine {
    pub message: Option<String>,
    pub search_prompt: Option<String>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn clear_message(&mut self) {
        self.message = None;
    }

    pub fn set_search_prompt(&mut self) {
        self.search_prompt = Some(String::new());
    }

    pub fn update_search_prompt(&mut self, buffer: String) {
        self.search_prompt = Some(buffer);
    }

    pub fn clear_search_prompt(&mut self) {
        self.search_prompt = None;
    }

    /// The prompt while typing, otherwise `mode | window | position [| matches] [| message]`.
    pub fn format_status_line(
        &self,
        mode: DisplayMode,
        recency: RecencyWindow,
        position: &str,
        matches: Option<&str>,
    ) -> String {
        if let Some(buffer) = &self.search_prompt {
            return format!("/{buffer}");
        }

        let mut parts = vec![
            mode.label().to_string(),
            recency.label().to_string(),
            position.to_string(),
        ];
        parts.extend(matches.map(str::to_string));
        parts.extend(self.message.clone());
        parts.join(" | ")
    }
}
