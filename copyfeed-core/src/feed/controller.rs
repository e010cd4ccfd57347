//! Synchronous feed controller: state machine plus data source in one owner.
//!
//! Runs every fetch inline on the calling thread. Hosts that must not block
//! (the TUI) drive `FeedState` and `fetch_page` separately instead.

use std::sync::Arc;
use std::time::Instant;

use super::fetch::{fetch_page, CancelToken, ScopeFallback};
use super::state::{Completion, FeedState, LoadTicket};
use crate::config::FeedConfig;
use crate::domain::Signal;
use crate::filter::FilterTag;
use crate::source::{SessionProvider, SignalSource};

pub struct FeedController {
    state: FeedState,
    source: Arc<dyn SignalSource>,
    session: Arc<dyn SessionProvider>,
    cancel: CancelToken,
    fallback: ScopeFallback,
}

impl FeedController {
    pub fn new(
        source: Arc<dyn SignalSource>,
        session: Arc<dyn SessionProvider>,
        config: &FeedConfig,
    ) -> Self {
        Self {
            state: FeedState::from_config(config),
            source,
            session,
            cancel: CancelToken::new(),
            fallback: config.missing_user_scope,
        }
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn signals(&self) -> &[Signal] {
        self.state.signals()
    }

    /// Token that aborts in-flight and future fetches of this controller.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Normalize and apply new filters, then reload from page 1.
    pub fn set_filters(&mut self, requested: impl IntoIterator<Item = FilterTag>) -> Completion {
        let ticket = self.state.set_filters(requested);
        self.run(ticket)
    }

    /// Flip one filter chip, then reload from page 1.
    pub fn toggle_filter(&mut self, tag: FilterTag) -> Completion {
        let ticket = self.state.toggle_filter(tag);
        self.run(ticket)
    }

    /// Fetch a page. `reset` reloads from page 1; otherwise the next page is
    /// appended. Errors are logged and reflected in the load state, never
    /// returned.
    pub fn load_signals(&mut self, reset: bool, is_refreshing: bool) -> Completion {
        let ticket = if reset {
            self.state.begin_reset(is_refreshing)
        } else {
            self.state.begin_next_page()
        };
        self.run(ticket)
    }

    /// Pull-to-refresh. Returns the number of signals now displayed, or
    /// `None` if the refresh did not apply.
    pub fn on_refresh(&mut self) -> Option<usize> {
        match self.load_signals(true, true) {
            Completion::Applied { total, .. } => Some(total),
            _ => None,
        }
    }

    /// Infinite-scroll trigger. `None` means no fetch was issued.
    pub fn on_load_more(&mut self) -> Option<Completion> {
        let ticket = self.state.begin_load_more()?;
        Some(self.run(ticket))
    }

    /// Retry the last failed load.
    pub fn retry(&mut self) -> Option<Completion> {
        let ticket = self.state.retry()?;
        Some(self.run(ticket))
    }

    /// Current refresh notice, if still showing.
    pub fn notice(&self) -> Option<&str> {
        self.state.notice(Instant::now())
    }

    fn run(&mut self, ticket: LoadTicket) -> Completion {
        let result = fetch_page(
            self.source.as_ref(),
            self.session.as_ref(),
            &ticket.request,
            &self.cancel,
            self.fallback,
        );
        self.state.complete(&ticket, result, Instant::now())
    }
}

impl Drop for FeedController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
