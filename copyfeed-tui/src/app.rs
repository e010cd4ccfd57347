//! Application state for the feed screen.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, Sender};
use std::time::Instant;

use chrono::NaiveDateTime;

use copyfeed_core::domain::Signal;
use copyfeed_core::feed::{CancelToken, Completion, FeedState, LoadKind, LoadTicket};
use copyfeed_core::filter::FilterTag;
use copyfeed_core::source::FetchError;

use crate::worker::{WorkerCommand, WorkerResponse};

/// How close to the end of the list the cursor gets before the next page is
/// requested.
pub const LOAD_MORE_THRESHOLD: usize = 3;

const ERROR_HISTORY_CAP: usize = 50;

/// Status message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// An error record for the error history overlay.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub timestamp: NaiveDateTime,
    pub category: ErrorCategory,
    pub message: String,
    pub context: String,
}

/// Error category for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Backend,
    Auth,
    Data,
    Other,
}

impl ErrorCategory {
    pub fn label(self) -> &'static str {
        match self {
            ErrorCategory::Network => "NET",
            ErrorCategory::Backend => "API",
            ErrorCategory::Auth => "AUTH",
            ErrorCategory::Data => "DATA",
            ErrorCategory::Other => "ERR",
        }
    }

    pub fn of(error: &FetchError) -> Self {
        match error {
            FetchError::Network(_) => ErrorCategory::Network,
            FetchError::Backend { .. } | FetchError::CircuitBreakerTripped => {
                ErrorCategory::Backend
            }
            FetchError::Unauthorized(_) => ErrorCategory::Auth,
            FetchError::Malformed(_) | FetchError::Fixture(_) => ErrorCategory::Data,
            FetchError::Cancelled => ErrorCategory::Other,
        }
    }
}

/// Which overlay (if any) is shown on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    None,
    Help,
    ErrorHistory,
    Detail(usize), // index into the feed list
}

/// Top-level application state.
pub struct AppState {
    pub running: bool,

    // Feed
    pub feed: FeedState,
    pub cursor: usize,

    // Worker communication
    pub worker_tx: Sender<WorkerCommand>,
    pub worker_rx: Receiver<WorkerResponse>,
    pub cancel: CancelToken,

    // Cross-cutting
    pub status_message: Option<(String, StatusLevel)>,
    pub error_history: VecDeque<ErrorRecord>,
    pub error_scroll: usize,
    pub overlay: Overlay,

    // Header
    pub source_name: String,
    pub user_label: Option<String>,
}

impl AppState {
    pub fn new(
        feed: FeedState,
        worker_tx: Sender<WorkerCommand>,
        worker_rx: Receiver<WorkerResponse>,
        cancel: CancelToken,
        source_name: String,
        user_label: Option<String>,
    ) -> Self {
        Self {
            running: true,
            feed,
            cursor: 0,
            worker_tx,
            worker_rx,
            cancel,
            status_message: None,
            error_history: VecDeque::with_capacity(ERROR_HISTORY_CAP),
            error_scroll: 0,
            overlay: Overlay::None,
            source_name,
            user_label,
        }
    }

    /// Push an error to the history, capping at 50.
    pub fn push_error(&mut self, category: ErrorCategory, message: String, context: String) {
        let record = ErrorRecord {
            timestamp: chrono::Local::now().naive_local(),
            category,
            message: message.clone(),
            context,
        };
        self.error_history.push_front(record);
        if self.error_history.len() > ERROR_HISTORY_CAP {
            self.error_history.pop_back();
        }
        self.status_message = Some((message, StatusLevel::Error));
    }

    /// Set an info status message.
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Info));
    }

    /// Set a warning status message.
    pub fn set_warning(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Warning));
    }

    // ── Loads ───────────────────────────────────────────────────────

    fn dispatch(&mut self, ticket: LoadTicket) {
        tracing::debug!(
            generation = ticket.generation,
            kind = ?ticket.kind,
            max_count = ticket.request.max_count,
            "dispatching load"
        );
        if self.worker_tx.send(WorkerCommand::Load(ticket)).is_err() {
            self.push_error(
                ErrorCategory::Other,
                "background worker is not running".into(),
                "dispatch".into(),
            );
        }
    }

    /// First load when the screen opens.
    pub fn start(&mut self) {
        let ticket = self.feed.begin_reset(false);
        self.dispatch(ticket);
    }

    /// Pull-to-refresh.
    pub fn refresh(&mut self) {
        let ticket = self.feed.begin_reset(true);
        self.dispatch(ticket);
    }

    /// Request the next page, unless a load is running or the feed is exhausted.
    pub fn load_more(&mut self) -> bool {
        match self.feed.begin_load_more() {
            Some(ticket) => {
                self.dispatch(ticket);
                true
            }
            None => false,
        }
    }

    pub fn toggle_filter(&mut self, tag: FilterTag) {
        let ticket = self.feed.toggle_filter(tag);
        self.set_status(format!("Filters: {}", self.feed.filters()));
        self.dispatch(ticket);
    }

    /// Re-run the failed load, if any.
    pub fn retry(&mut self) {
        match self.feed.retry() {
            Some(ticket) => self.dispatch(ticket),
            None => self.set_warning("Nothing to retry"),
        }
    }

    /// Apply one worker response to the feed.
    pub fn handle_worker_response(&mut self, response: WorkerResponse, now: Instant) {
        match response {
            WorkerResponse::Page { ticket, result } => {
                let category = result.as_ref().err().map(ErrorCategory::of);
                match self.feed.complete(&ticket, result, now) {
                    Completion::Applied { kind, added, total } => {
                        if kind.is_reset() {
                            self.cursor = 0;
                        }
                        self.clamp_cursor();
                        match kind {
                            LoadKind::Initial => self.set_status(format!("{total} signals")),
                            LoadKind::More if added == 0 => self.set_status("No new signals"),
                            LoadKind::More => self.set_status(format!("+{added} signals")),
                            // The feed's own notice covers refresh.
                            LoadKind::Refresh => self.status_message = None,
                        }
                    }
                    Completion::Failed(failure) => {
                        let context = match failure.kind {
                            LoadKind::Initial => "initial load",
                            LoadKind::Refresh => "refresh",
                            LoadKind::More => "load more",
                        };
                        self.push_error(
                            category.unwrap_or(ErrorCategory::Other),
                            failure.message,
                            context.into(),
                        );
                    }
                    Completion::Cancelled | Completion::Stale => {}
                }
            }
        }
    }

    /// Drain every pending worker response.
    pub fn drain_worker(&mut self, now: Instant) -> usize {
        let mut handled = 0;
        while let Ok(response) = self.worker_rx.try_recv() {
            self.handle_worker_response(response, now);
            handled += 1;
        }
        handled
    }

    /// Per-frame housekeeping.
    pub fn tick(&mut self, now: Instant) {
        self.feed.expire_notice(now);
    }

    // ── Cursor ──────────────────────────────────────────────────────

    pub fn selected_signal(&self) -> Option<&Signal> {
        self.feed.signals().get(self.cursor)
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Move down; nearing the end of the list requests the next page.
    pub fn move_down(&mut self) {
        let len = self.feed.signals().len();
        if self.cursor + 1 < len {
            self.cursor += 1;
        }
        if len > 0 && self.cursor + LOAD_MORE_THRESHOLD >= len {
            self.load_more();
        }
    }

    pub fn jump_top(&mut self) {
        self.cursor = 0;
    }

    /// Jump to the last row and ask for more.
    pub fn jump_bottom(&mut self) {
        self.cursor = self.feed.signals().len().saturating_sub(1);
        self.load_more();
    }

    fn clamp_cursor(&mut self) {
        let len = self.feed.signals().len();
        if self.cursor >= len {
            self.cursor = len.saturating_sub(1);
        }
    }

    /// Stop the worker from delivering anything else.
    pub fn shutdown(&mut self) {
        self.running = false;
        self.cancel.cancel();
        let _ = self.worker_tx.send(WorkerCommand::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use copyfeed_core::domain::{Direction, SignalId, SignalStatus, TraderId};
    use copyfeed_core::feed::{LoadState, PageFetch};
    use proptest::prelude::*;
    use std::sync::mpsc;
    use std::time::Duration;

    fn signal(n: u32) -> Signal {
        Signal {
            id: SignalId::new(format!("a{n}")),
            trader_id: TraderId::from("t1"),
            pair: "BTC/USDT".into(),
            direction: Direction::Long,
            entry_price: None,
            stop_loss: None,
            take_profit: None,
            leverage: None,
            status: SignalStatus::Active,
            signal_time: Utc.timestamp_opt(1_700_000_000 - i64::from(n), 0).unwrap(),
        }
    }

    fn page(range: std::ops::Range<u32>) -> PageFetch {
        let signals: Vec<Signal> = range.map(signal).collect();
        PageFetch {
            fetched: signals.len(),
            signals,
        }
    }

    fn test_app(page_size: usize) -> (AppState, Receiver<WorkerCommand>, Sender<WorkerResponse>) {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let app = AppState::new(
            FeedState::new(page_size, Duration::from_secs(2)),
            cmd_tx,
            resp_rx,
            CancelToken::new(),
            "fixture".into(),
            None,
        );
        (app, cmd_rx, resp_tx)
    }

    fn next_ticket(rx: &Receiver<WorkerCommand>) -> LoadTicket {
        match rx.try_recv() {
            Ok(WorkerCommand::Load(ticket)) => ticket,
            other => panic!("expected a load command, got {other:?}"),
        }
    }

    #[test]
    fn start_dispatches_initial_load() {
        let (mut app, rx, _tx) = test_app(10);
        app.start();
        let ticket = next_ticket(&rx);
        assert_eq!(ticket.kind, LoadKind::Initial);
        assert!(app.feed.is_initial_loading());
    }

    #[test]
    fn page_response_updates_feed_and_status() {
        let (mut app, rx, tx) = test_app(3);
        app.start();
        let ticket = next_ticket(&rx);
        tx.send(WorkerResponse::Page {
            ticket,
            result: Ok(page(0..3)),
        })
        .unwrap();

        assert_eq!(app.drain_worker(Instant::now()), 1);
        assert_eq!(app.feed.signals().len(), 3);
        assert_eq!(app.feed.load_state(), &LoadState::Loaded);
        assert_eq!(
            app.status_message,
            Some(("3 signals".to_string(), StatusLevel::Info))
        );
    }

    #[test]
    fn scrolling_to_the_end_requests_more() {
        let (mut app, rx, _tx) = test_app(5);
        app.start();
        let ticket = next_ticket(&rx);
        app.handle_worker_response(
            WorkerResponse::Page {
                ticket,
                result: Ok(page(0..5)),
            },
            Instant::now(),
        );

        app.move_down();
        assert!(rx.try_recv().is_err(), "cursor still far from the end");
        app.move_down();
        let more = next_ticket(&rx);
        assert_eq!(more.kind, LoadKind::More);
        assert_eq!(more.request.max_count, 10);

        // A second request while loading is suppressed.
        app.move_down();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn failure_is_recorded_in_history() {
        let (mut app, rx, _tx) = test_app(5);
        app.start();
        let ticket = next_ticket(&rx);
        app.handle_worker_response(
            WorkerResponse::Page {
                ticket,
                result: Err(FetchError::Network("connection refused".into())),
            },
            Instant::now(),
        );

        assert_eq!(app.error_history.len(), 1);
        let record = &app.error_history[0];
        assert_eq!(record.category, ErrorCategory::Network);
        assert_eq!(record.context, "initial load");
        assert!(app.feed.failure().is_some());

        app.retry();
        assert_eq!(next_ticket(&rx).kind, LoadKind::Initial);
    }

    #[test]
    fn stale_response_is_ignored() {
        let (mut app, rx, _tx) = test_app(5);
        app.start();
        let stale = next_ticket(&rx);
        app.toggle_filter(FilterTag::Long);
        let _fresh = next_ticket(&rx);

        app.handle_worker_response(
            WorkerResponse::Page {
                ticket: stale,
                result: Ok(page(0..5)),
            },
            Instant::now(),
        );
        assert!(app.feed.signals().is_empty());
        assert!(app.feed.is_initial_loading());
    }

    #[test]
    fn error_history_caps_at_fifty() {
        let (mut app, _rx, _tx) = test_app(5);
        for i in 0..60 {
            app.push_error(ErrorCategory::Other, format!("e{i}"), String::new());
        }
        assert_eq!(app.error_history.len(), 50);
        assert_eq!(app.error_history[0].message, "e59");
    }

    #[test]
    fn shutdown_cancels_and_notifies_worker() {
        let (mut app, rx, _tx) = test_app(5);
        app.shutdown();
        assert!(!app.running);
        assert!(app.cancel.is_cancelled());
        assert!(matches!(rx.try_recv(), Ok(WorkerCommand::Shutdown)));
    }

    proptest! {
        /// The cursor always points at a row (or 0 for an empty list).
        #[test]
        fn cursor_stays_in_bounds(
            rows in 0u32..30,
            moves in prop::collection::vec(0u8..4, 0..60),
        ) {
            let (mut app, rx, _tx) = test_app(50);
            app.start();
            let ticket = next_ticket(&rx);
            app.handle_worker_response(
                WorkerResponse::Page { ticket, result: Ok(page(0..rows)) },
                Instant::now(),
            );

            for m in moves {
                match m {
                    0 => app.move_up(),
                    1 => app.move_down(),
                    2 => app.jump_top(),
                    _ => app.jump_bottom(),
                }
                let len = app.feed.signals().len();
                prop_assert!(app.cursor < len.max(1));
            }
        }
    }
}
