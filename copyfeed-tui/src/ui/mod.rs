//! Top-level UI layout: filter chips, feed table, status bar.

pub mod feed_panel;
pub mod filter_bar;
pub mod overlays;
pub mod status_bar;

use std::time::Instant;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::widgets::{Block, Borders};
use ratatui::Frame;

use crate::app::{AppState, Overlay};
use crate::theme;

/// Draw the entire UI.
pub fn draw(f: &mut Frame, app: &AppState, now: Instant) {
    // Split: chip row + feed + 1-line status bar.
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    let chips_area = chunks[0];
    let main_area = chunks[1];
    let status_area = chunks[2];

    filter_bar::render(f, chips_area, app);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::panel_border(app.overlay == Overlay::None))
        .title(panel_title(app))
        .title_style(theme::panel_title(true));
    let inner = block.inner(main_area);
    f.render_widget(block, main_area);
    feed_panel::render(f, inner, app);

    status_bar::render(f, status_area, app, now);

    // Draw overlays on top.
    match &app.overlay {
        Overlay::Help => overlays::render_help(f, main_area),
        Overlay::ErrorHistory => overlays::render_error_history(f, main_area, app),
        Overlay::Detail(idx) => overlays::render_detail(f, main_area, app, *idx),
        Overlay::None => {}
    }
}

fn panel_title(app: &AppState) -> String {
    match &app.user_label {
        Some(user) => format!(" Signals · {} · {} ", app.source_name, user),
        None => format!(" Signals · {} ", app.source_name),
    }
}

/// Compute a centered rect for overlays.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
