//! Overlay widgets: help, signal detail, error history.

use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::AppState;
use crate::theme;
use crate::ui::centered_rect;
use crate::ui::feed_panel::{leverage, price};

const HELP: &[(&str, &str)] = &[
    ("j / k, arrows", "move through the feed"),
    ("g / G", "jump to top / bottom (loads the next page)"),
    ("m", "load the next page"),
    ("r", "refresh from the first page"),
    ("R", "retry the load that failed"),
    ("a", "all directions"),
    ("l / s", "long / short (both together merges the two)"),
    ("u", "only traders you subscribe to"),
    ("f", "only traders you follow"),
    ("Enter", "signal details"),
    ("e", "error history"),
    ("q", "quit"),
];

pub fn render_help(f: &mut Frame, area: Rect) {
    let popup = centered_rect(60, 60, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::accent())
        .title(" Keys ")
        .title_style(theme::accent_bold());

    let mut text = vec![Line::from("")];
    for (keys, action) in HELP {
        text.push(Line::from(vec![
            Span::styled(format!("  {:<16}", keys), theme::accent()),
            Span::styled(*action, theme::muted()),
        ]));
    }
    text.push(Line::from(""));
    text.push(Line::from(Span::styled(
        "  Press any key to dismiss...",
        theme::neutral(),
    )));

    let para = Paragraph::new(text).block(block).wrap(Wrap { trim: false });
    f.render_widget(para, popup);
}

/// Error history overlay.
pub fn render_error_history(f: &mut Frame, area: Rect, app: &AppState) {
    let popup = centered_rect(80, 70, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::negative())
        .title(format!(
            " Error History ({}) [Esc]close [j/k]scroll ",
            app.error_history.len()
        ))
        .title_style(theme::negative());

    let inner = block.inner(popup);
    f.render_widget(block, popup);

    if app.error_history.is_empty() {
        let text = Paragraph::new(Span::styled("No errors recorded.", theme::muted()));
        f.render_widget(text, inner);
        return;
    }

    let visible_height = inner.height as usize;
    let mut lines: Vec<Line> = Vec::new();
    for (i, err) in app
        .error_history
        .iter()
        .enumerate()
        .skip(app.error_scroll)
        .take(visible_height)
    {
        let style = if i == app.error_scroll {
            theme::negative().add_modifier(Modifier::BOLD)
        } else {
            theme::muted()
        };

        lines.push(Line::from(vec![
            Span::styled(
                format!("[{}] ", err.timestamp.format("%H:%M:%S")),
                theme::muted(),
            ),
            Span::styled(format!("[{}] ", err.category.label()), theme::warning()),
            Span::styled(err.message.as_str(), style),
        ]));

        if !err.context.is_empty() {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(err.context.as_str(), theme::muted()),
            ]));
        }
    }

    f.render_widget(Paragraph::new(lines), inner);
}

/// Detail view for one signal.
pub fn render_detail(f: &mut Frame, area: Rect, app: &AppState, idx: usize) {
    let popup = centered_rect(60, 60, area);
    f.render_widget(Clear, popup);

    let Some(signal) = app.feed.signals().get(idx) else {
        return;
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::accent())
        .title(format!(" {} [Esc]close ", signal.pair))
        .title_style(theme::accent_bold());

    let field = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("  {:<12}", label), theme::muted()),
            Span::styled(value, theme::text()),
        ])
    };

    let text = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(format!("  {:<12}", "Direction"), theme::muted()),
            Span::styled(
                signal.direction.as_str().to_uppercase(),
                theme::direction(signal.direction).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled(format!("  {:<12}", "Status"), theme::muted()),
            Span::styled(signal.status.label(), theme::status(signal.status)),
        ]),
        field("Entry", price(signal.entry_price.as_deref())),
        field("Stop loss", price(signal.stop_loss.as_deref())),
        field("Take profit", price(signal.take_profit.as_deref())),
        field("Leverage", leverage(signal.leverage.as_deref())),
        field(
            "Time",
            signal
                .signal_time
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        ),
        field("Trader", signal.trader_id.to_string()),
        field("Signal id", signal.id.to_string()),
    ];

    let para = Paragraph::new(text).block(block).wrap(Wrap { trim: false });
    f.render_widget(para, popup);
}
