//! Bottom status bar: load state, refresh notice, last status message, key hints.

use std::time::Instant;

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use copyfeed_core::feed::LoadState;

use crate::app::{AppState, StatusLevel};
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState, now: Instant) {
    let feed = &app.feed;
    let mut spans: Vec<Span> = Vec::new();

    let state_style = match feed.load_state() {
        LoadState::Failed(_) => theme::negative(),
        LoadState::Loaded => theme::accent(),
        _ => theme::warning(),
    };
    spans.push(Span::styled(format!(" [{}]", feed.load_state().label()), state_style));
    if !feed.has_more() {
        spans.push(Span::styled(" end", theme::muted()));
    }

    spans.push(Span::raw(" | "));

    // The refresh notice wins over older status messages while it lasts.
    if let Some(notice) = feed.notice(now) {
        spans.push(Span::styled(notice, theme::accent_bold()));
    } else if let Some((msg, level)) = &app.status_message {
        let style = match level {
            StatusLevel::Info => theme::accent(),
            StatusLevel::Warning => theme::warning(),
            StatusLevel::Error => theme::negative(),
        };
        spans.push(Span::styled(msg.as_str(), style));
    }

    spans.push(Span::styled(
        if feed.failure().is_some() {
            "  R:retry r:refresh e:errors ?:help q:quit"
        } else {
            "  r:refresh m:more a/l/s/u/f:filters ?:help q:quit"
        },
        theme::muted(),
    ));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
