//! Remote calls for one page of the feed.
//!
//! `fetch_page` is free of feed state so it can run on whichever thread the
//! host chooses (inline in the controller, on the TUI worker). The long+short
//! case forks both direction queries and joins before merging.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::merge::{dedupe_last_wins, merge_directions};
use crate::domain::{Direction, Signal, TraderId, UserId};
use crate::filter::{DirectionQuery, FilterSet, ScopeFilter};
use crate::source::{FetchError, SessionProvider, SignalSource};

pub use crate::source::CancelToken;

/// What a scope filter does when no user is signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeFallback {
    /// Ignore the scope filter and show every signal.
    #[default]
    Unfiltered,
    /// Show nothing.
    Empty,
}

/// Filters and cumulative size for one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub filters: FilterSet,
    /// Cumulative count: `page_size * target_page`.
    pub max_count: usize,
}

/// Result of one page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFetch {
    /// Deduplicated, scope-filtered signals in display order.
    pub signals: Vec<Signal>,
    /// Unique signals the source returned before scope filtering.
    pub fetched: usize,
}

/// Fetch one page for `request`.
pub fn fetch_page(
    source: &dyn SignalSource,
    session: &dyn SessionProvider,
    request: &PageRequest,
    cancel: &CancelToken,
    fallback: ScopeFallback,
) -> Result<PageFetch, FetchError> {
    let scope = request.filters.scope();
    let user = if scope.is_active() {
        let user = session.current_user_id();
        if user.is_none() {
            tracing::debug!(?fallback, "scope filter requested without a signed-in user");
            if fallback == ScopeFallback::Empty {
                return Ok(PageFetch {
                    signals: Vec::new(),
                    fetched: 0,
                });
            }
        }
        user
    } else {
        None
    };

    cancel.check()?;
    let signals = fetch_signals(source, request.filters.direction_query(), request.max_count)?;
    cancel.check()?;
    let fetched = signals.len();

    let signals = match user {
        Some(user) => {
            let allowed = fetch_scope_ids(source, &user, scope, cancel)?;
            signals
                .into_iter()
                .filter(|s| allowed.contains(&s.trader_id))
                .collect()
        }
        None => signals,
    };

    tracing::debug!(
        source = source.name(),
        filters = %request.filters,
        max_count = request.max_count,
        fetched,
        kept = signals.len(),
        "fetched page"
    );

    Ok(PageFetch { signals, fetched })
}

fn fetch_signals(
    source: &dyn SignalSource,
    query: DirectionQuery,
    max_count: usize,
) -> Result<Vec<Signal>, FetchError> {
    let signals = match query {
        DirectionQuery::Both => {
            let (long, short) = rayon::join(
                || source.fetch_signals_by_direction(Direction::Long, max_count),
                || source.fetch_signals_by_direction(Direction::Short, max_count),
            );
            return Ok(merge_directions(long?, short?));
        }
        DirectionQuery::Long => source.fetch_signals_by_direction(Direction::Long, max_count)?,
        DirectionQuery::Short => source.fetch_signals_by_direction(Direction::Short, max_count)?,
        DirectionQuery::All => source.fetch_active_signals(max_count)?,
    };
    Ok(dedupe_last_wins(signals))
}

/// Union of the trader ids selected by the active scope tags.
fn fetch_scope_ids(
    source: &dyn SignalSource,
    user: &UserId,
    scope: ScopeFilter,
    cancel: &CancelToken,
) -> Result<HashSet<TraderId>, FetchError> {
    let mut allowed = HashSet::new();
    if scope.subscribed {
        cancel.check()?;
        allowed.extend(source.fetch_subscribed_trader_ids(user)?);
    }
    if scope.followed {
        cancel.check()?;
        allowed.extend(source.fetch_followed_trader_ids(user)?);
    }
    cancel.check()?;
    Ok(allowed)
}
