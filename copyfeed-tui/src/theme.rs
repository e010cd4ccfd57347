//! Neon-on-charcoal theme tokens for the feed screen.
//!
//! - **Accent**: electric cyan (focus, headers)
//! - **Positive**: neon green (long)
//! - **Negative**: hot pink (short, errors)
//! - **Warning**: neon orange (stale/failed states)
//! - **Muted**: steel blue (hints, secondary text)

use ratatui::style::{Color, Modifier, Style};

use copyfeed_core::domain::{Direction, SignalStatus};

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub background: Color,
    pub accent: Color,
    pub positive: Color,
    pub negative: Color,
    pub warning: Color,
    pub neutral: Color,
    pub muted: Color,
    pub text_primary: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::neon()
    }
}

impl Theme {
    pub fn neon() -> Self {
        Self {
            background: Color::Rgb(18, 18, 20),
            accent: Color::Rgb(0, 255, 255),
            positive: Color::Rgb(0, 255, 128),
            negative: Color::Rgb(255, 20, 147),
            warning: Color::Rgb(255, 140, 0),
            neutral: Color::Rgb(147, 112, 219),
            muted: Color::Rgb(100, 149, 237),
            text_primary: Color::White,
        }
    }

    pub fn direction_color(&self, direction: Direction) -> Color {
        match direction {
            Direction::Long => self.positive,
            Direction::Short => self.negative,
        }
    }

    pub fn status_color(&self, status: SignalStatus) -> Color {
        match status {
            SignalStatus::Active => self.accent,
            SignalStatus::Closed => self.neutral,
            SignalStatus::Cancelled => self.muted,
        }
    }
}

const THEME: Theme = Theme {
    background: Color::Rgb(18, 18, 20),
    accent: Color::Rgb(0, 255, 255),
    positive: Color::Rgb(0, 255, 128),
    negative: Color::Rgb(255, 20, 147),
    warning: Color::Rgb(255, 140, 0),
    neutral: Color::Rgb(147, 112, 219),
    muted: Color::Rgb(100, 149, 237),
    text_primary: Color::White,
};

pub fn accent() -> Style {
    Style::default().fg(THEME.accent)
}

pub fn accent_bold() -> Style {
    accent().add_modifier(Modifier::BOLD)
}

pub fn muted() -> Style {
    Style::default().fg(THEME.muted)
}

pub fn text() -> Style {
    Style::default().fg(THEME.text_primary)
}

pub fn warning() -> Style {
    Style::default().fg(THEME.warning)
}

pub fn negative() -> Style {
    Style::default().fg(THEME.negative)
}

pub fn direction(direction: Direction) -> Style {
    Style::default().fg(THEME.direction_color(direction))
}

pub fn status(status: SignalStatus) -> Style {
    Style::default().fg(THEME.status_color(status))
}

/// Filter chip: reversed when active.
pub fn chip(active: bool) -> Style {
    if active {
        accent_bold().add_modifier(Modifier::REVERSED)
    } else {
        muted()
    }
}

pub fn neutral() -> Style {
    Style::default().fg(THEME.neutral)
}

pub fn panel_border(active: bool) -> Style {
    if active {
        Style::default().fg(THEME.accent).bg(THEME.background)
    } else {
        Style::default().fg(THEME.neutral).bg(THEME.background)
    }
}

pub fn panel_title(active: bool) -> Style {
    if active {
        accent_bold()
    } else {
        muted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn const_theme_matches_default() {
        let theme = Theme::default();
        assert_eq!(theme.accent, THEME.accent);
        assert_eq!(theme.negative, THEME.negative);
        assert_eq!(theme.background, THEME.background);
    }

    #[test]
    fn direction_colors() {
        let theme = Theme::default();
        assert_eq!(theme.direction_color(Direction::Long), theme.positive);
        assert_eq!(theme.direction_color(Direction::Short), theme.negative);
    }

    #[test]
    fn status_colors() {
        let theme = Theme::default();
        assert_eq!(theme.status_color(SignalStatus::Active), theme.accent);
        assert_eq!(theme.status_color(SignalStatus::Closed), theme.neutral);
        assert_eq!(theme.status_color(SignalStatus::Cancelled), theme.muted);
    }

    #[test]
    fn active_chip_is_reversed() {
        assert!(chip(true).add_modifier.contains(Modifier::REVERSED));
        assert!(!chip(false).add_modifier.contains(Modifier::REVERSED));
    }
}
