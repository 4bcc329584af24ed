//! Styles for the session browser.
//!
//! Each speaker role and each match tier gets its own style so a transcript can be read
//! at a glance. The monochrome palette keeps those distinctions with modifiers alone.

use crate::config::ThemeName;
use crate::model::Role;
use crate::search::MatchTier;
use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone)]
pub struct ColorTheme {
    /// Title bar and the active query.
    pub header: Style,
    /// Timestamps, block numbers and other secondary text.
    pub muted: Style,
    pub border: Style,
    pub selection: Style,
    pub status: Style,
    pub progress: Style,
    /// Marker on sessions that had unparseable lines.
    pub parse_failure: Style,
    /// Query terms inside the transcript.
    pub hit: Style,
    /// The match the user is stepping through.
    pub current_match: Style,
    roles: RoleStyles,
    tiers: TierStyles,
}

#[derive(Debug, Clone)]
struct RoleStyles {
    user: Style,
    assistant: Style,
    system: Style,
    tool: Style,
}

#[derive(Debug, Clone)]
struct TierStyles {
    direct: Style,
    word: Style,
    fuzzy: Style,
}

fn bold(color: Color) -> Style {
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            header: bold(Color::Cyan),
            muted: Style::default().fg(Color::DarkGray),
            border: Style::default().fg(Color::DarkGray),
            selection: Style::default().fg(Color::White).bg(Color::Blue),
            status: Style::default().fg(Color::White).bg(Color::Blue),
            progress: Style::default().fg(Color::Green),
            parse_failure: Style::default().fg(Color::Red),
            hit: Style::default().fg(Color::Black).bg(Color::Yellow),
            current_match: Style::default().fg(Color::Black).bg(Color::LightYellow),
            roles: RoleStyles {
                user: bold(Color::Green),
                assistant: bold(Color::Cyan),
                system: bold(Color::Magenta),
                tool: bold(Color::Yellow),
            },
            tiers: TierStyles {
                direct: Style::default().fg(Color::Green),
                word: Style::default().fg(Color::Yellow),
                fuzzy: Style::default().fg(Color::DarkGray),
            },
        }
    }
}

impl ColorTheme {
    pub fn named(name: ThemeName) -> Self {
        match name {
            ThemeName::Color => Self::default(),
            ThemeName::Monochrome => Self::monochrome(),
        }
    }

    /// For terminals without color support.
    pub fn monochrome() -> Self {
        let plain = Style::default();
        let reversed = plain.add_modifier(Modifier::REVERSED);
        Self {
            header: plain.add_modifier(Modifier::BOLD),
            muted: plain.add_modifier(Modifier::DIM),
            border: plain,
            selection: reversed,
            status: reversed,
            progress: plain,
            parse_failure: plain.add_modifier(Modifier::BOLD),
            hit: plain.add_modifier(Modifier::UNDERLINED),
            current_match: reversed,
            roles: RoleStyles {
                user: plain.add_modifier(Modifier::BOLD),
                assistant: plain.add_modifier(Modifier::BOLD | Modifier::ITALIC),
                system: plain.add_modifier(Modifier::DIM),
                tool: plain.add_modifier(Modifier::ITALIC),
            },
            tiers: TierStyles {
                direct: plain.add_modifier(Modifier::BOLD),
                word: plain,
                fuzzy: plain.add_modifier(Modifier::DIM),
            },
        }
    }

    pub fn role(&self, role: Role) -> Style {
        match role {
            Role::User => self.roles.user,
            Role::Assistant => self.roles.assistant,
            Role::System => self.roles.system,
            Role::Tool => self.roles.tool,
        }
    }

    pub fn tier(&self, tier: MatchTier) -> Style {
        match tier {
            MatchTier::Direct => self.tiers.direct,
            MatchTier::Word => self.tiers.word,
            MatchTier::Fuzzy => self.tiers.fuzzy,
        }
    }
}
