//! Feed state machine: single-owner, owned by one screen.
//!
//! Every load is split in two: `begin_*` moves the state into a loading
//! variant and hands out a `LoadTicket`; `complete` applies the fetch result
//! for that ticket. Tickets carry a generation number and only the latest one
//! may change the list, so a refresh racing a load-more (or a filter change
//! arriving mid-load) cannot interleave list mutations.

use std::collections::BTreeSet;
use std::fmt;
use std::time::{Duration, Instant};

use super::fetch::{PageFetch, PageRequest};
use super::merge::{append_unseen, dedupe_last_wins};
use crate::config::FeedConfig;
use crate::domain::Signal;
use crate::filter::{FilterSet, FilterTag};
use crate::source::FetchError;

/// Why a load was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    /// First load or filter change: full-screen spinner, list replaced.
    Initial,
    /// Pull-to-refresh: list replaced, no full-screen spinner.
    Refresh,
    /// Next page appended to the list.
    More,
}

impl LoadKind {
    pub fn is_reset(self) -> bool {
        !matches!(self, LoadKind::More)
    }
}

/// A load that ended in an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFailure {
    pub kind: LoadKind,
    pub message: String,
}

/// Loading lifecycle. At most one load is ever in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    InitialLoading,
    Refreshing,
    LoadingMore,
    Loaded,
    Failed(FeedFailure),
}

impl LoadState {
    pub fn label(&self) -> &'static str {
        match self {
            LoadState::Idle => "idle",
            LoadState::InitialLoading => "loading",
            LoadState::Refreshing => "refreshing",
            LoadState::LoadingMore => "loading more",
            LoadState::Loaded => "loaded",
            LoadState::Failed(_) => "failed",
        }
    }
}

/// Handle for one in-flight load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: u64,
    pub kind: LoadKind,
    /// Page number the cursor moves to when this load succeeds.
    pub target_page: usize,
    pub request: PageRequest,
}

/// What `complete` did with a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Applied {
        kind: LoadKind,
        /// Entries new to the list (the whole list for reset loads).
        added: usize,
        total: usize,
    },
    Failed(FeedFailure),
    /// The fetch was cancelled; state settled without changes.
    Cancelled,
    /// A newer load superseded this ticket; nothing changed.
    Stale,
}

/// Transient confirmation shown after a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub expires_at: Instant,
}

/// In-memory working set of one feed screen.
#[derive(Debug, Clone)]
pub struct FeedState {
    signals: Vec<Signal>,
    filters: FilterSet,
    page: usize,
    page_size: usize,
    has_more: bool,
    load: LoadState,
    generation: u64,
    loaded_once: bool,
    notice: Option<Notice>,
    notice_ttl: Duration,
}

impl FeedState {
    pub fn new(page_size: usize, notice_ttl: Duration) -> Self {
        Self {
            signals: Vec::new(),
            filters: FilterSet::default(),
            page: 1,
            page_size: page_size.max(1),
            has_more: true,
            load: LoadState::Idle,
            generation: 0,
            loaded_once: false,
            notice: None,
            notice_ttl,
        }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(config.page_size, config.refresh_notice())
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn is_initial_loading(&self) -> bool {
        self.load == LoadState::InitialLoading
    }

    pub fn is_refreshing(&self) -> bool {
        self.load == LoadState::Refreshing
    }

    pub fn is_loading_more(&self) -> bool {
        self.load == LoadState::LoadingMore
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self.load,
            LoadState::InitialLoading | LoadState::Refreshing | LoadState::LoadingMore
        )
    }

    pub fn failure(&self) -> Option<&FeedFailure> {
        match &self.load {
            LoadState::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Replace the filters and start a full reload.
    ///
    /// Reloads even when the normalized set equals the active one.
    pub fn set_filters(&mut self, requested: impl IntoIterator<Item = FilterTag>) -> LoadTicket {
        let requested: BTreeSet<FilterTag> = requested.into_iter().collect();
        self.filters = FilterSet::normalize(&self.filters, &requested);
        self.begin(LoadKind::Initial)
    }

    /// Flip one filter chip and start a full reload.
    pub fn toggle_filter(&mut self, tag: FilterTag) -> LoadTicket {
        self.filters = self.filters.toggle(tag);
        self.begin(LoadKind::Initial)
    }

    /// Start a reset load (page 1). `refreshing` selects pull-to-refresh.
    pub fn begin_reset(&mut self, refreshing: bool) -> LoadTicket {
        self.begin(if refreshing {
            LoadKind::Refresh
        } else {
            LoadKind::Initial
        })
    }

    /// Start loading the next page without checking the guards.
    pub fn begin_next_page(&mut self) -> LoadTicket {
        self.begin(LoadKind::More)
    }

    /// Start loading the next page, unless a load is in flight, the last
    /// page came back short, or the list is awaiting a reset that failed.
    ///
    /// After a failed reset the list still belongs to the previous filters,
    /// so appending a page of the current ones would mix the two; only
    /// `retry` (or a new reset) can move on from there.
    pub fn begin_load_more(&mut self) -> Option<LoadTicket> {
        let reset_failed = self.failure().is_some_and(|f| f.kind.is_reset());
        if self.is_busy() || !self.has_more || reset_failed {
            tracing::trace!(
                busy = self.is_busy(),
                has_more = self.has_more,
                reset_failed,
                "load more skipped"
            );
            return None;
        }
        Some(self.begin(LoadKind::More))
    }

    /// Re-run the load that failed last, if the feed is in `Failed`.
    pub fn retry(&mut self) -> Option<LoadTicket> {
        let kind = self.failure()?.kind;
        Some(self.begin(kind))
    }

    fn begin(&mut self, kind: LoadKind) -> LoadTicket {
        self.generation += 1;
        if kind.is_reset() {
            self.page = 1;
            self.has_more = true;
        }
        let target_page = if kind.is_reset() { 1 } else { self.page + 1 };
        self.load = match kind {
            LoadKind::Initial => LoadState::InitialLoading,
            LoadKind::Refresh => LoadState::Refreshing,
            LoadKind::More => LoadState::LoadingMore,
        };
        LoadTicket {
            generation: self.generation,
            kind,
            target_page,
            request: PageRequest {
                filters: self.filters.clone(),
                max_count: self.page_size * target_page,
            },
        }
    }

    fn settled(&self) -> LoadState {
        if self.loaded_once {
            LoadState::Loaded
        } else {
            LoadState::Idle
        }
    }

    /// Apply the outcome of the fetch for `ticket`.
    pub fn complete(
        &mut self,
        ticket: &LoadTicket,
        result: Result<PageFetch, FetchError>,
        now: Instant,
    ) -> Completion {
        if ticket.generation != self.generation {
            tracing::debug!(
                ticket = ticket.generation,
                latest = self.generation,
                "dropping superseded page"
            );
            return Completion::Stale;
        }

        let page = match result {
            Ok(page) => page,
            Err(e) if e.is_cancelled() => {
                self.load = self.settled();
                return Completion::Cancelled;
            }
            Err(e) => {
                tracing::warn!(
                    kind = ?ticket.kind,
                    filters = %ticket.request.filters,
                    error = %e,
                    "feed load failed"
                );
                let failure = FeedFailure {
                    kind: ticket.kind,
                    message: e.to_string(),
                };
                self.load = LoadState::Failed(failure.clone());
                return Completion::Failed(failure);
            }
        };

        self.has_more = page.fetched >= ticket.request.max_count;
        self.page = ticket.target_page;

        let added = if ticket.kind.is_reset() {
            self.signals = dedupe_last_wins(page.signals);
            self.signals.len()
        } else {
            append_unseen(&mut self.signals, page.signals)
        };

        self.loaded_once = true;
        self.load = LoadState::Loaded;

        if ticket.kind == LoadKind::Refresh {
            self.notice = Some(Notice {
                text: format!("Loaded {} signals", self.signals.len()),
                expires_at: now + self.notice_ttl,
            });
        }

        tracing::info!(
            kind = ?ticket.kind,
            page = self.page,
            added,
            total = self.signals.len(),
            has_more = self.has_more,
            "feed updated"
        );

        Completion::Applied {
            kind: ticket.kind,
            added,
            total: self.signals.len(),
        }
    }

    /// The refresh notice, if it has not expired by `now`.
    pub fn notice(&self, now: Instant) -> Option<&str> {
        self.notice
            .as_ref()
            .filter(|n| now < n.expires_at)
            .map(|n| n.text.as_str())
    }

    /// Drop an expired notice. Returns true if one was dropped.
    pub fn expire_notice(&mut self, now: Instant) -> bool {
        match &self.notice {
            Some(n) if now >= n.expires_at => {
                self.notice = None;
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for FeedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} signals | page {} | {} | {}{}",
            self.signals.len(),
            self.page,
            self.filters,
            self.load.label(),
            if self.has_more { "" } else { " | end" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, SignalId, SignalStatus, TraderId};
    use chrono::{TimeZone, Utc};

    fn signal(id: u32) -> Signal {
        Signal {
            id: SignalId::new(format!("s{id}")),
            trader_id: TraderId::from("t1"),
            pair: "XRP/USDT".into(),
            direction: Direction::Long,
            entry_price: None,
            stop_loss: None,
            take_profit: None,
            leverage: None,
            status: SignalStatus::Active,
            signal_time: Utc.timestamp_opt(1_700_000_000 - i64::from(id), 0).unwrap(),
        }
    }

    fn page(ids: std::ops::Range<u32>) -> PageFetch {
        let signals: Vec<Signal> = ids.map(signal).collect();
        PageFetch {
            fetched: signals.len(),
            signals,
        }
    }

    #[test]
    fn starts_idle_with_all_filter() {
        let state = FeedState::new(20, Duration::from_secs(2));
        assert_eq!(state.load_state(), &LoadState::Idle);
        assert_eq!(state.filters(), &FilterSet::default());
        assert!(state.has_more());
        assert!(!state.is_busy());
    }

    #[test]
    fn initial_load_then_more() {
        let now = Instant::now();
        let mut state = FeedState::new(2, Duration::from_secs(2));

        let first = state.begin_reset(false);
        assert!(state.is_initial_loading());
        assert_eq!(first.request.max_count, 2);
        state.complete(&first, Ok(page(0..2)), now);
        assert_eq!(state.load_state(), &LoadState::Loaded);
        assert!(state.has_more());

        let more = state.begin_load_more().unwrap();
        assert!(state.is_loading_more());
        assert_eq!(more.request.max_count, 4);
        assert_eq!(more.target_page, 2);
        let done = state.complete(&more, Ok(page(0..3)), now);
        assert_eq!(
            done,
            Completion::Applied {
                kind: LoadKind::More,
                added: 1,
                total: 3
            }
        );
        assert_eq!(state.page(), 2);
        assert!(!state.has_more());
        assert!(state.begin_load_more().is_none());
    }

    #[test]
    fn load_more_blocked_while_busy() {
        let mut state = FeedState::new(20, Duration::from_secs(2));
        let _ticket = state.begin_reset(false);
        assert!(state.begin_load_more().is_none());
    }

    #[test]
    fn superseded_ticket_is_ignored() {
        let now = Instant::now();
        let mut state = FeedState::new(2, Duration::from_secs(2));
        let first = state.begin_reset(false);
        state.complete(&first, Ok(page(0..2)), now);

        let more = state.begin_load_more().unwrap();
        let refresh = state.begin_reset(true);
        assert_eq!(state.complete(&more, Ok(page(0..4)), now), Completion::Stale);
        assert!(state.is_refreshing());
        assert_eq!(state.signals().len(), 2);

        state.complete(&refresh, Ok(page(10..12)), now);
        let ids: Vec<&str> = state.signals().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s10", "s11"]);
    }

    #[test]
    fn failure_keeps_list_and_pagination() {
        let now = Instant::now();
        let mut state = FeedState::new(2, Duration::from_secs(2));
        let first = state.begin_reset(false);
        state.complete(&first, Ok(page(0..2)), now);

        let more = state.begin_load_more().unwrap();
        let done = state.complete(&more, Err(FetchError::Network("down".into())), now);
        assert!(matches!(done, Completion::Failed(ref f) if f.kind == LoadKind::More));
        assert_eq!(state.signals().len(), 2);
        assert_eq!(state.page(), 1);
        assert!(state.has_more());
        assert!(!state.is_busy());

        let retry = state.retry().unwrap();
        assert_eq!(retry.kind, LoadKind::More);
        assert_eq!(retry.target_page, 2);
    }

    #[test]
    fn reset_rewinds_pagination_when_it_starts() {
        let now = Instant::now();
        let mut state = FeedState::new(2, Duration::from_secs(2));
        let first = state.begin_reset(false);
        state.complete(&first, Ok(page(0..2)), now);
        let more = state.begin_load_more().unwrap();
        state.complete(&more, Ok(page(0..3)), now);
        assert_eq!(state.page(), 2);
        assert!(!state.has_more());

        let _refresh = state.begin_reset(true);
        assert_eq!(state.page(), 1);
        assert!(state.has_more());
    }

    #[test]
    fn failed_filter_change_blocks_load_more_until_retry() {
        let now = Instant::now();
        let mut state = FeedState::new(2, Duration::from_secs(2));
        let first = state.begin_reset(false);
        state.complete(&first, Ok(page(0..2)), now);
        let more = state.begin_load_more().unwrap();
        state.complete(&more, Ok(page(0..4)), now);

        let change = state.toggle_filter(FilterTag::Short);
        state.complete(&change, Err(FetchError::Network("down".into())), now);
        assert_eq!(state.page(), 1);
        assert!(state.has_more());
        assert_eq!(state.signals().len(), 4, "old list stays on screen");
        assert!(state.begin_load_more().is_none());

        let retry = state.retry().unwrap();
        assert_eq!(retry.kind, LoadKind::Initial);
        assert_eq!(retry.target_page, 1);
        assert_eq!(retry.request.filters, FilterSet::from_tags([FilterTag::Short]));
    }

    #[test]
    fn cancelled_first_load_returns_to_idle() {
        let mut state = FeedState::new(2, Duration::from_secs(2));
        let first = state.begin_reset(false);
        let done = state.complete(&first, Err(FetchError::Cancelled), Instant::now());
        assert_eq!(done, Completion::Cancelled);
        assert_eq!(state.load_state(), &LoadState::Idle);
    }

    #[test]
    fn refresh_notice_expires() {
        let now = Instant::now();
        let mut state = FeedState::new(5, Duration::from_secs(2));
        let refresh = state.begin_reset(true);
        state.complete(&refresh, Ok(page(0..3)), now);

        assert_eq!(state.notice(now), Some("Loaded 3 signals"));
        assert!(!state.expire_notice(now + Duration::from_secs(1)));
        assert_eq!(state.notice(now + Duration::from_secs(2)), None);
        assert!(state.expire_notice(now + Duration::from_secs(2)));
        assert!(!state.expire_notice(now + Duration::from_secs(3)));
    }

    #[test]
    fn initial_load_sets_no_notice() {
        let now = Instant::now();
        let mut state = FeedState::new(5, Duration::from_secs(2));
        let first = state.begin_reset(false);
        state.complete(&first, Ok(page(0..3)), now);
        assert_eq!(state.notice(now), None);
    }

    #[test]
    fn display_summarizes() {
        let state = FeedState::new(20, Duration::from_secs(2));
        assert_eq!(state.to_string(), "0 signals | page 1 | all | idle");
    }
}
