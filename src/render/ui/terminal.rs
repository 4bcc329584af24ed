//! Terminal UI implementation using ratatui.
//!
//! Layout: a one-line header, the session (or match) list beside a detail pane, and the
//! status line. While a load is running the body is replaced by a progress gauge.

use crate::error::Result;
use crate::loader::LoadProgress;
use crate::model::{BlockContent, Session};
use crate::render::ui::state::{locate_transcript_line, DisplayMode, ViewState};
use crate::render::ui::{ColorTheme, Screen};
use crate::search::fold::{fold, FoldedText};
use crate::search::SearchMatch;
use ratatui::crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block as Panel, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io::{self, Stdout};

type CrosstermTerminal = Terminal<CrosstermBackend<Stdout>>;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub struct TerminalUI {
    terminal: Option<CrosstermTerminal>,
    theme: ColorTheme,
}

impl TerminalUI {
    pub fn new() -> Result<Self> {
        Self::with_theme(ColorTheme::default())
    }

    pub fn with_theme(theme: ColorTheme) -> Result<Self> {
        Ok(Self {
            terminal: None,
            theme,
        })
    }
}

impl Screen for TerminalUI {
    fn draw(&mut self, view_state: &ViewState) -> Result<()> {
        if let Some(ref mut terminal) = self.terminal {
            let theme = &self.theme;
            terminal.draw(move |frame| draw(frame, view_state, theme))?;
        }
        Ok(())
    }

    fn enter(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.hide_cursor()?;
        self.terminal = Some(terminal);
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if let Some(mut terminal) = self.terminal.take() {
            disable_raw_mode()?;
            execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)?;
            terminal.show_cursor()?;
        }
        Ok(())
    }

    fn size(&self) -> Result<(u16, u16)> {
        let (cols, rows) = ratatui::crossterm::terminal::size()?;
        Ok((cols, rows))
    }
}

impl Drop for TerminalUI {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

/// Draw one frame. Free-standing so it can be exercised against a test backend.
pub fn draw(frame: &mut Frame, view_state: &ViewState, theme: &ColorTheme) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.size());

    render_header(frame, rows[0], view_state, theme);
    match &view_state.loading {
        Some(progress) => render_loading(frame, rows[1], progress.as_ref(), theme),
        None => {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
                .split(rows[1]);
            render_list(frame, columns[0], view_state, theme);
            render_detail(frame, columns[1], view_state, theme);
        }
    }
    render_status(frame, rows[2], view_state, theme);
}

fn render_header(frame: &mut Frame, area: Rect, view_state: &ViewState, theme: &ColorTheme) {
    let store = view_state.store();
    let mut spans = vec![
        Span::styled("sessionscope ", theme.header),
        Span::styled(
            view_state.root.display().to_string(),
            theme.muted,
        ),
        Span::raw(format!(
            "  {} sessions, {} blocks",
            store.len(),
            store.total_blocks()
        )),
    ];
    if let Some(query) = &view_state.active_query {
        spans.push(Span::styled(format!("  /{query}"), theme.header));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_loading(
    frame: &mut Frame,
    area: Rect,
    progress: Option<&LoadProgress>,
    theme: &ColorTheme,
) {
    let (ratio, label) = match progress {
        None => (0.0, "starting".to_string()),
        Some(LoadProgress::Scanning(scan)) => (
            0.0,
            format!(
                "scanning: {} entries, {} files",
                scan.entries_seen, scan.files_found
            ),
        ),
        Some(LoadProgress::Parsing(parse)) => (
            parse.done as f64 / parse.total.max(1) as f64,
            format!("parsing: {}/{} files", parse.done, parse.total),
        ),
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);
    let gauge = Gauge::default()
        .block(Panel::default().borders(Borders::ALL).title("Loading"))
        .gauge_style(theme.progress)
        .ratio(ratio.clamp(0.0, 1.0))
        .label(label);
    frame.render_widget(gauge, rows[1]);
}

fn render_list(frame: &mut Frame, area: Rect, view_state: &ViewState, theme: &ColorTheme) {
    let store = view_state.store();
    let (title, items): (String, Vec<ListItem>) = match (view_state.results(), view_state.display_mode)
    {
        (Some(results), DisplayMode::ResultBrowser) => (
            format!("Matches ({})", results.len()),
            results
                .matches
                .iter()
                .map(|m| match_row(m, store.get(m.session_index), theme))
                .collect(),
        ),
        (None, DisplayMode::ResultBrowser) => ("Matches".to_string(), Vec::new()),
        _ => {
            let visible = view_state.visible_sessions();
            (
                format!("Sessions ({})", visible.len()),
                visible
                    .iter()
                    .filter_map(|&idx| store.get(idx))
                    .map(|session| session_row(session, theme))
                    .collect(),
            )
        }
    };

    let empty = items.is_empty();
    let list = List::new(items)
        .block(
            Panel::default()
                .borders(Borders::ALL)
                .border_style(theme.border)
                .title(title),
        )
        .highlight_style(theme.selection);
    let mut state = ListState::default().with_selected((!empty).then_some(view_state.selected()));
    frame.render_stateful_widget(list, area, &mut state);
}

fn session_row(session: &Session, theme: &ColorTheme) -> ListItem<'static> {
    let modified = session
        .metadata
        .modified
        .map(|m| m.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| "-".repeat(16));
    let mut spans = vec![
        Span::styled(modified, theme.muted),
        Span::raw(" "),
        Span::raw(short_name(&session.name())),
        Span::styled(format!(" {} blocks", session.blocks.len()), theme.muted),
    ];
    if session.report.skipped_lines > 0 || session.report.truncated {
        spans.push(Span::styled(" !", theme.parse_failure));
    }
    ListItem::new(Line::from(spans))
}

fn match_row(m: &SearchMatch, session: Option<&std::sync::Arc<Session>>, theme: &ColorTheme) -> ListItem<'static> {
    let name = session.map(|s| short_name(&s.name())).unwrap_or_default();
    let preview: String = m.snippet.text.chars().take(80).collect();
    ListItem::new(Line::from(vec![
        Span::styled(format!("{:<6} ", m.tier.label()), theme.tier(m.tier)),
        Span::styled(format!("{name}#{} ", m.block_index + 1), theme.muted),
        Span::raw(preview),
    ]))
}

fn short_name(name: &str) -> String {
    name.chars().take(8).collect()
}

fn render_detail(frame: &mut Frame, area: Rect, view_state: &ViewState, theme: &ColorTheme) {
    let panel = Panel::default()
        .borders(Borders::ALL)
        .border_style(theme.border);

    let Some(session) = view_state.selected_session() else {
        let hint = match &view_state.load_summary {
            Some(summary) => summary.clone(),
            None => "No sessions".to_string(),
        };
        frame.render_widget(Paragraph::new(hint).block(panel.title("Detail")), area);
        return;
    };

    let paragraph = match view_state.display_mode {
        DisplayMode::FullDetail => {
            let needles: Vec<String> = view_state
                .results()
                .map(|r| r.query.terms.iter().map(|t| fold(t)).collect())
                .unwrap_or_default();
            let window = TranscriptWindow {
                first_line: view_state.detail_scroll,
                rows: usize::from(area.height.saturating_sub(2)),
            };
            let lines = transcript_lines(session, &needles, view_state.selected_match(), window, theme);
            Paragraph::new(lines).block(panel.title(format!("Transcript {}", session.name())))
        }
        _ => {
            let scroll = u16::try_from(view_state.detail_scroll).unwrap_or(u16::MAX);
            Paragraph::new(summary_lines(session, view_state.selected_match(), theme))
                .block(panel.title(format!("Session {}", session.name())))
                .scroll((scroll, 0))
        }
    };
    frame.render_widget(paragraph.wrap(Wrap { trim: false }), area);
}

fn summary_lines(
    session: &Session,
    selected: Option<&SearchMatch>,
    theme: &ColorTheme,
) -> Vec<Line<'static>> {
    let insights = session.insights();
    let dim = theme.muted;
    let field = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{label:<10}"), dim),
            Span::raw(value),
        ])
    };

    let mut lines = vec![
        field("path", session.path.display().to_string()),
        field("project", session.project().unwrap_or_default()),
        field(
            "modified",
            session
                .metadata
                .modified
                .map(|m| m.format(TIME_FORMAT).to_string())
                .unwrap_or_default(),
        ),
        field(
            "blocks",
            format!(
                "{} ({} lines skipped{})",
                session.blocks.len(),
                session.report.skipped_lines,
                if session.report.truncated { ", partial" } else { "" }
            ),
        ),
    ];

    let roles: Vec<String> = insights
        .role_counts
        .iter()
        .map(|(role, count)| format!("{} {count}", role.label()))
        .collect();
    lines.push(field("roles", roles.join(", ")));
    if let Some(secs) = insights.duration_secs {
        lines.push(field("duration", format!("{}m {}s", secs / 60, secs % 60)));
    }
    lines.push(field("words", insights.total_words.to_string()));
    if !insights.top_tools.is_empty() {
        let tools: Vec<String> = insights
            .top_tools
            .iter()
            .map(|(name, count)| format!("{name} ×{count}"))
            .collect();
        lines.push(field("tools", tools.join(", ")));
    }
    if !insights.languages.is_empty() {
        lines.push(field("languages", insights.languages.join(", ")));
    }
    if !insights.top_keywords.is_empty() {
        let keywords: Vec<&str> = insights.top_keywords.iter().map(|(k, _)| k.as_str()).collect();
        lines.push(field("keywords", keywords.join(", ")));
    }

    if let Some(m) = selected {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            format!("{} match in block {}", m.tier.label(), m.block_index + 1),
            theme.tier(m.tier),
        )));
        lines.push(highlighted_line(&m.snippet.text, &m.snippet.highlights, theme.current_match));
    }
    lines
}

/// Slice of the transcript that fits the detail pane.
#[derive(Debug, Clone, Copy)]
struct TranscriptWindow {
    first_line: usize,
    rows: usize,
}

/// Transcript lines from `window.first_line`, stopping once the pane is full.
///
/// Wrapped lines only take more room, so `window.rows` unwrapped lines always cover it.
fn transcript_lines(
    session: &Session,
    needles: &[String],
    selected: Option<&SearchMatch>,
    window: TranscriptWindow,
    theme: &ColorTheme,
) -> Vec<Line<'static>> {
    let Some((first_block, mut skip)) = locate_transcript_line(session, window.first_line) else {
        return Vec::new();
    };

    let mut lines = Vec::with_capacity(window.rows);
    for (idx, block) in session.blocks.iter().enumerate().skip(first_block) {
        let focused = selected.is_some_and(|m| m.block_index == idx);
        let full = !push_row(&mut lines, &mut skip, window.rows, || {
            let mut heading = vec![
                Span::styled(format!("[{}]", block.role.label()), theme.role(block.role)),
                Span::styled(
                    format!(" {} line {}", block.timestamp.format(TIME_FORMAT), block.line),
                    theme.muted,
                ),
            ];
            match &block.content {
                BlockContent::ToolInvocation { name, .. } => {
                    heading.push(Span::styled(format!(" {name}"), theme.role(block.role)));
                }
                BlockContent::SystemEvent { kind, .. } | BlockContent::Unknown { kind, .. } => {
                    heading.push(Span::styled(format!(" {kind}"), theme.muted));
                }
                BlockContent::Text(_) => {}
            }
            if focused {
                heading.push(Span::styled(" ◀", theme.current_match));
            }
            Line::from(heading)
        });
        if full {
            break;
        }

        let style = if focused {
            theme.current_match
        } else {
            theme.hit
        };
        for text_line in block.text().lines() {
            let room = push_row(&mut lines, &mut skip, window.rows, || {
                highlighted_line(text_line, &term_ranges(text_line, needles), style)
            });
            if !room {
                return lines;
            }
        }
        if !push_row(&mut lines, &mut skip, window.rows, Line::default) {
            break;
        }
    }
    lines
}

/// Add one row unless it is still above the window. Returns false once the window is full.
fn push_row(
    lines: &mut Vec<Line<'static>>,
    skip: &mut usize,
    rows: usize,
    make: impl FnOnce() -> Line<'static>,
) -> bool {
    if *skip > 0 {
        *skip -= 1;
        return true;
    }
    if lines.len() >= rows {
        return false;
    }
    lines.push(make());
    lines.len() < rows
}

/// Byte ranges in `line` covered by any of the lowercase `needles`, merged and sorted.
pub fn term_ranges(line: &str, needles: &[String]) -> Vec<(usize, usize)> {
    if needles.is_empty() {
        return Vec::new();
    }
    let folded = FoldedText::new(line);
    let mut ranges: Vec<(usize, usize)> = needles
        .iter()
        .flat_map(|needle| folded.find_all(needle))
        .collect();
    ranges.sort_unstable();

    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Split `content` into plain and highlighted spans. Ranges off a char boundary are dropped.
pub fn highlighted_line(content: &str, highlights: &[(usize, usize)], style: Style) -> Line<'static> {
    if highlights.is_empty() {
        return Line::from(content.to_string());
    }

    let mut spans = Vec::new();
    let mut last_end = 0;
    for &(start, end) in highlights {
        if start < last_end || end <= start {
            continue;
        }
        let (Some(before), Some(hit)) = (content.get(last_end..start), content.get(start..end))
        else {
            continue;
        };
        if !before.is_empty() {
            spans.push(Span::raw(before.to_string()));
        }
        spans.push(Span::styled(hit.to_string(), style));
        last_end = end;
    }
    if let Some(rest) = content.get(last_end..) {
        if !rest.is_empty() {
            spans.push(Span::raw(rest.to_string()));
        }
    }
    Line::from(spans)
}

fn render_status(frame: &mut Frame, area: Rect, view_state: &ViewState, theme: &ColorTheme) {
    let status = Paragraph::new(view_state.format_status_line()).style(theme.status);
    frame.render_widget(status, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::session;
    use crate::parse::ParseProgress;
    use crate::search::SearchEngine;
    use crate::store::SessionStore;
    use chrono::Utc;
    use ratatui::backend::TestBackend;
    use ratatui::style::Color;
    use std::sync::Arc;

    fn screen(view: &ViewState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        let theme = ColorTheme::default();
        terminal.draw(|frame| draw(frame, view, &theme)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer.content.iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn terminal_ui_starts_detached() {
        let ui = TerminalUI::new().unwrap();
        assert!(ui.terminal.is_none());
        assert_eq!(ui.theme.status.bg, Some(Color::Blue));

        let mono = TerminalUI::with_theme(ColorTheme::monochrome()).unwrap();
        assert_eq!(mono.theme.status.bg, None);
    }

    #[test]
    fn highlights_split_into_spans() {
        let style = Style::default().bg(Color::Yellow);
        let line = highlighted_line("fix the auth token", &[(8, 12), (13, 18)], style);
        let parts: Vec<(&str, bool)> = line
            .spans
            .iter()
            .map(|s| (s.content.as_ref(), s.style == style))
            .collect();
        assert_eq!(
            parts,
            vec![("fix the ", false), ("auth", true), (" ", false), ("token", true)]
        );
    }

    #[test]
    fn bad_ranges_are_skipped() {
        let style = Style::default();
        let line = highlighted_line("héllo", &[(1, 2), (3, 40)], style);
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "héllo");
    }

    #[test]
    fn term_ranges_merge_overlaps() {
        let needles = vec!["auth".to_string(), "authentication".to_string()];
        assert_eq!(term_ranges("Authentication ok, auth", &needles), vec![(0, 14), (19, 23)]);
        assert!(term_ranges("anything", &[]).is_empty());
    }

    #[test]
    fn transcript_starts_at_the_current_match() {
        let texts: Vec<String> = (0..30_000)
            .map(|i| {
                if i == 25_000 {
                    "the lost needle".to_string()
                } else {
                    format!("entry {i}")
                }
            })
            .collect();
        let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
        let mut view = ViewState::new("/logs", 100, 20);
        view.install_store(
            Arc::new(SessionStore::new(vec![session("/logs/p/big.jsonl", 1, &texts)])),
            Utc::now(),
        );
        view.cycle_display_mode();
        let results = SearchEngine::default().search("needle", view.store());
        view.apply_results(results);
        assert!(view.detail_scroll > usize::from(u16::MAX));

        let text = screen(&view);
        assert!(text.contains("line 25001"));
        assert!(text.contains("the lost needle"));
        assert!(!text.contains("entry 24999"));
        assert!(text.contains("entry 25001"));
    }

    #[test]
    fn transcript_window_is_bounded() {
        let sess = session("/logs/p/a.jsonl", 1, &["one", "two\nthree", "four"]);
        let window = TranscriptWindow {
            first_line: 4,
            rows: 3,
        };
        let lines = transcript_lines(&sess, &[], None, window, &ColorTheme::default());
        let text: Vec<String> = lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(text.len(), 3);
        assert_eq!(text[0], "two");
        assert_eq!(text[1], "three");
        assert_eq!(text[2], "");
    }

    #[test]
    fn loading_view_shows_progress() {
        let mut view = ViewState::new("/logs", 100, 20);
        view.loading = Some(Some(LoadProgress::Parsing(ParseProgress { done: 3, total: 12 })));
        assert!(screen(&view).contains("parsing: 3/12 files"));
    }

    #[test]
    fn browser_lists_sessions_and_matches() {
        let mut view = ViewState::new("/logs", 100, 20);
        view.install_store(
            Arc::new(SessionStore::new(vec![session(
                "/logs/proj/abcdef0123.jsonl",
                1_700_000_000,
                &["rotate the signing keys", "done"],
            )])),
            Utc::now(),
        );
        let text = screen(&view);
        assert!(text.contains("Sessions (1)"));
        assert!(text.contains("abcdef01"));
        assert!(text.contains("summary | all | 1/1"));

        let results = SearchEngine::default().search("signing", view.store());
        view.active_query = Some("signing".to_string());
        view.apply_results(results);
        view.cycle_display_mode();
        view.cycle_display_mode();
        let text = screen(&view);
        assert!(text.contains("Matches (1)"));
        assert!(text.contains("direct"));
    }
}
