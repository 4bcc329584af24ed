//! Recency windows for narrowing sessions by modification time.

use crate::error::{Result, ScopeError};
use chrono::{DateTime, Duration, Utc};

/// Window cycled from the browser with `t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecencyWindow {
    #[default]
    All,
    Day,
    Week,
    Month,
}

impl RecencyWindow {
    pub fn next(self) -> Self {
        match self {
            RecencyWindow::All => RecencyWindow::Day,
            RecencyWindow::Day => RecencyWindow::Week,
            RecencyWindow::Week => RecencyWindow::Month,
            RecencyWindow::Month => RecencyWindow::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RecencyWindow::All => "all",
            RecencyWindow::Day => "24h",
            RecencyWindow::Week => "7d",
            RecencyWindow::Month => "30d",
        }
    }

    pub fn span(self) -> Option<Duration> {
        match self {
            RecencyWindow::All => None,
            RecencyWindow::Day => Some(Duration::hours(24)),
            RecencyWindow::Week => Some(Duration::days(7)),
            RecencyWindow::Month => Some(Duration::days(30)),
        }
    }

    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.span().and_then(|span| now.checked_sub_signed(span))
    }
}

/// Parse `90s`, `30m`, `24h`, `7d` or `2w`.
pub fn parse_window(text: &str) -> Result<Duration> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| ScopeError::invalid_argument(format!("missing unit in `{text}`")))?;
    let (digits, unit) = text.split_at(split);
    let amount: i64 = digits
        .parse()
        .map_err(|_| ScopeError::invalid_argument(format!("invalid window `{text}`")))?;

    let span = match unit {
        "s" => Duration::try_seconds(amount),
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        "w" => Duration::try_weeks(amount),
        _ => {
            return Err(ScopeError::invalid_argument(format!(
                "unknown unit `{unit}` in `{text}` (use s, m, h, d or w)"
            )))
        }
    };
    span.ok_or_else(|| ScopeError::invalid_argument(format!("window `{text}` is too large")))
}

/// Start of the window `text` ending at `now`.
pub fn window_start(now: DateTime<Utc>, text: &str) -> Result<DateTime<Utc>> {
    let span = parse_window(text)?;
    now.checked_sub_signed(span).ok_or_else(|| {
        ScopeError::invalid_argument(format!("window `{text}` reaches before the earliest date"))
    })
}
