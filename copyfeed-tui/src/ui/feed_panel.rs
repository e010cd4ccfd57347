//! Signal table with loading, empty and failure placeholders.

use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use copyfeed_core::domain::Signal;
use copyfeed_core::feed::{LoadKind, LoadState};

use crate::app::AppState;
use crate::theme;

/// Rows taken by the column header and the footer line.
const CHROME_ROWS: usize = 2;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let feed = &app.feed;
    let mut lines: Vec<Line> = Vec::new();

    if feed.signals().is_empty() {
        lines.push(Line::from(""));
        lines.push(empty_placeholder(feed.load_state()));
        f.render_widget(Paragraph::new(lines), area);
        return;
    }

    lines.push(Line::from(Span::styled(
        format!(
            "{:<19} {:<12} {:<5} {:>12} {:>12} {:>12} {:>4} {:<9} {:<12}",
            "Time", "Pair", "Side", "Entry", "Stop", "Target", "Lev", "Status", "Trader"
        ),
        theme::accent_bold(),
    )));

    let visible = (area.height as usize).saturating_sub(CHROME_ROWS).max(1);
    let start = scroll_start(app.cursor, visible);
    let end = (start + visible).min(feed.signals().len());

    for (i, signal) in feed.signals()[start..end].iter().enumerate() {
        lines.push(row(signal, start + i == app.cursor));
    }

    lines.push(footer(app));
    f.render_widget(Paragraph::new(lines), area);
}

/// First visible row so that `cursor` stays on screen.
pub fn scroll_start(cursor: usize, visible: usize) -> usize {
    if visible == 0 || cursor < visible {
        0
    } else {
        cursor + 1 - visible
    }
}

fn empty_placeholder(state: &LoadState) -> Line<'static> {
    match state {
        LoadState::Idle | LoadState::InitialLoading | LoadState::Refreshing => Line::from(
            Span::styled("  Loading signals...", theme::muted()),
        ),
        LoadState::Failed(failure) => Line::from(vec![
            Span::styled(
                format!("  Could not load signals: {}", failure.message),
                theme::negative(),
            ),
            Span::styled("  [R]etry", theme::muted()),
        ]),
        LoadState::LoadingMore | LoadState::Loaded => Line::from(Span::styled(
            "  No signals match these filters. [a] shows everything.",
            theme::muted(),
        )),
    }
}

fn row(signal: &Signal, is_cursor: bool) -> Line<'static> {
    let base = if is_cursor {
        theme::text().add_modifier(Modifier::REVERSED)
    } else {
        theme::text()
    };
    let time = signal
        .signal_time
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M")
        .to_string();

    Line::from(vec![
        Span::styled(format!("{:<19} ", time), base),
        Span::styled(format!("{:<12} ", truncate(&signal.pair, 12)), base),
        Span::styled(
            format!("{:<5} ", signal.direction.as_str().to_uppercase()),
            theme::direction(signal.direction).patch(base_modifier(is_cursor)),
        ),
        Span::styled(format!("{:>12} ", price(signal.entry_price.as_deref())), base),
        Span::styled(format!("{:>12} ", price(signal.stop_loss.as_deref())), base),
        Span::styled(format!("{:>12} ", price(signal.take_profit.as_deref())), base),
        Span::styled(format!("{:>4} ", leverage(signal.leverage.as_deref())), base),
        Span::styled(
            format!("{:<9} ", signal.status.label()),
            theme::status(signal.status).patch(base_modifier(is_cursor)),
        ),
        Span::styled(truncate(signal.trader_id.as_str(), 12), theme::muted()),
    ])
}

fn base_modifier(is_cursor: bool) -> Style {
    if is_cursor {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    }
}

fn footer(app: &AppState) -> Line<'static> {
    let feed = &app.feed;
    match feed.load_state() {
        LoadState::LoadingMore => Line::from(Span::styled("  Loading more...", theme::muted())),
        LoadState::Failed(failure) if failure.kind == LoadKind::More => Line::from(vec![
            Span::styled("  Could not load more signals", theme::negative()),
            Span::styled("  [R]etry", theme::muted()),
        ]),
        _ if !feed.has_more() => Line::from(Span::styled(
            format!("  End of feed · {} signals", feed.signals().len()),
            theme::muted(),
        )),
        _ => Line::from(Span::styled(
            format!("  {} signals · page {}", feed.signals().len(), feed.page()),
            theme::muted(),
        )),
    }
}

/// Price as delivered, or a dash when absent.
pub fn price(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => "-".to_string(),
    }
}

pub fn leverage(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => format!("{}x", v.trim()),
        _ => "-".to_string(),
    }
}

/// Cut to `max` characters, marking the cut with `~`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('~');
        out
    }
}
