//! Data-access contracts for the feed and their implementations.
//!
//! The `SignalSource` trait abstracts over where signals come from (the hosted
//! backend's RPC functions, a JSON fixture) so the feed can be driven against
//! either and mocked in tests. Calls block; the feed decides what runs
//! concurrently.

pub mod circuit_breaker;
pub mod memory;
pub mod rest;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::domain::{Direction, Signal, TraderId, UserId};

pub use circuit_breaker::CircuitBreaker;
pub use memory::{Fixture, InMemorySource};
pub use rest::{RestSource, RestSourceOptions};

/// Why a fetch failed.
///
/// The feed treats all of these as one "fetch failed" condition; the variants
/// exist for logs and the error history. `Cancelled` is the only one the feed
/// handles differently (it is dropped without being reported).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    Network(String),

    #[error("backend returned HTTP {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("backend blocked: circuit breaker is open")]
    CircuitBreakerTripped,

    #[error("fixture error: {0}")]
    Fixture(String),

    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

/// Cancellation flag scoped to one screen's lifetime.
///
/// Clones share the flag. Once cancelled it stays cancelled. Sources that
/// block for long (retries, backoff) hold a clone and check it between steps.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Granularity of `sleep`'s cancellation checks.
    const POLL: Duration = Duration::from_millis(20);

    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancelled.
    pub fn check(&self) -> Result<(), FetchError> {
        if self.is_cancelled() {
            Err(FetchError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration`, waking early with `Err(Cancelled)` if the token
    /// is cancelled meanwhile.
    pub fn sleep(&self, duration: Duration) -> Result<(), FetchError> {
        let deadline = Instant::now() + duration;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep((deadline - now).min(Self::POLL));
        }
    }
}

/// Remote data-access functions the feed depends on.
pub trait SignalSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Most recent active signals, newest first, at most `max_count`.
    fn fetch_active_signals(&self, max_count: usize) -> Result<Vec<Signal>, FetchError>;

    /// Most recent active signals in one direction, newest first.
    fn fetch_signals_by_direction(
        &self,
        direction: Direction,
        max_count: usize,
    ) -> Result<Vec<Signal>, FetchError>;

    /// Traders the user has a paid subscription to.
    fn fetch_subscribed_trader_ids(&self, user: &UserId) -> Result<Vec<TraderId>, FetchError>;

    /// Traders the user follows.
    fn fetch_followed_trader_ids(&self, user: &UserId) -> Result<Vec<TraderId>, FetchError>;
}

/// Who is signed in, if anyone.
pub trait SessionProvider: Send + Sync {
    fn current_user_id(&self) -> Option<UserId>;
}

/// Session with a fixed (possibly absent) user, resolved from config or flags.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    user: Option<UserId>,
}

impl StaticSession {
    pub fn new(user: Option<UserId>) -> Self {
        Self { user }
    }

    pub fn signed_in(user: impl Into<String>) -> Self {
        Self {
            user: Some(UserId::new(user)),
        }
    }

    pub fn anonymous() -> Self {
        Self { user: None }
    }
}

impl SessionProvider for StaticSession {
    fn current_user_id(&self) -> Option<UserId> {
        self.user.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert_eq!(clone.check(), Ok(()));
        token.cancel();
        assert!(clone.is_cancelled());
        assert_eq!(clone.check(), Err(FetchError::Cancelled));
    }

    #[test]
    fn sleep_runs_to_completion_when_not_cancelled() {
        let start = Instant::now();
        assert_eq!(CancelToken::new().sleep(Duration::from_millis(30)), Ok(()));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn sleep_wakes_early_on_cancel() {
        let token = CancelToken::new();
        let canceller = token.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            canceller.cancel();
        });

        let start = Instant::now();
        assert_eq!(token.sleep(Duration::from_secs(10)), Err(FetchError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(2));
        handle.join().unwrap();
    }
}
