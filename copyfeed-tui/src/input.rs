//! Keyboard input dispatch: overlays → global keys → feed keys.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use copyfeed_core::filter::FilterTag;

use crate::app::{AppState, Overlay};

/// Handle a key event.
pub fn handle_key(app: &mut AppState, key: KeyEvent) {
    // Only handle key press events (Windows sends both Press and Release).
    if key.kind != KeyEventKind::Press {
        return;
    }

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.running = false;
        return;
    }

    // 1. Overlays consume input first.
    match &app.overlay {
        Overlay::Help => {
            app.overlay = Overlay::None;
            return;
        }
        Overlay::ErrorHistory => {
            handle_error_overlay(app, key);
            return;
        }
        Overlay::Detail(_) => {
            handle_detail_overlay(app, key);
            return;
        }
        Overlay::None => {}
    }

    // 2. Global keys.
    match key.code {
        KeyCode::Char('q') => {
            app.running = false;
            return;
        }
        KeyCode::Char('?') => {
            app.overlay = Overlay::Help;
            return;
        }
        KeyCode::Char('e') => {
            app.error_scroll = 0;
            app.overlay = Overlay::ErrorHistory;
            return;
        }
        _ => {}
    }

    // 3. Feed keys.
    handle_feed_key(app, key);
}

fn handle_error_overlay(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('e') => {
            app.overlay = Overlay::None;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if app.error_scroll + 1 < app.error_history.len() {
                app.error_scroll += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.error_scroll = app.error_scroll.saturating_sub(1);
        }
        _ => {}
    }
}

fn handle_detail_overlay(app: &mut AppState, key: KeyEvent) {
    if let KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') = key.code {
        app.overlay = Overlay::None;
    }
}

fn handle_feed_key(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.move_down(),
        KeyCode::Char('k') | KeyCode::Up => app.move_up(),
        KeyCode::Char('g') | KeyCode::Home => app.jump_top(),
        KeyCode::Char('G') | KeyCode::End => app.jump_bottom(),
        KeyCode::Char('r') => app.refresh(),
        KeyCode::Char('R') => app.retry(),
        KeyCode::Char('m') => {
            if !app.load_more() {
                let reason = if app.feed.failure().is_some_and(|f| f.kind.is_reset()) {
                    "Reload failed; press R to retry"
                } else if !app.feed.has_more() {
                    "End of feed"
                } else {
                    "A load is already running"
                };
                app.set_warning(reason);
            }
        }
        KeyCode::Char('a') => app.toggle_filter(FilterTag::All),
        KeyCode::Char('l') => app.toggle_filter(FilterTag::Long),
        KeyCode::Char('s') => app.toggle_filter(FilterTag::Short),
        KeyCode::Char('u') => app.toggle_filter(FilterTag::Subscribed),
        KeyCode::Char('f') => app.toggle_filter(FilterTag::Followed),
        KeyCode::Enter => {
            if app.selected_signal().is_some() {
                app.overlay = Overlay::Detail(app.cursor);
            }
        }
        _ => {}
    }
}
