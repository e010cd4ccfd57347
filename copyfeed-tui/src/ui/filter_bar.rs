//! Filter chip row.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use copyfeed_core::filter::FilterTag;

use crate::app::AppState;
use crate::theme;

/// Shortcut key shown next to each chip.
pub fn chip_key(tag: FilterTag) -> char {
    match tag {
        FilterTag::All => 'a',
        FilterTag::Long => 'l',
        FilterTag::Short => 's',
        FilterTag::Subscribed => 'u',
        FilterTag::Followed => 'f',
    }
}

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let filters = app.feed.filters();
    let mut spans: Vec<Span> = vec![Span::raw(" ")];

    for tag in FilterTag::ALL_TAGS {
        let active = filters.contains(tag);
        spans.push(Span::styled(
            format!(" {} {} ", chip_key(tag), tag.label()),
            theme::chip(active),
        ));
        spans.push(Span::raw(" "));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
