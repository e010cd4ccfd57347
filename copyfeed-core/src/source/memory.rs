//! Fixture-backed signal source.
//!
//! Serves signals from memory with the same ordering and truncation rules as
//! the backend's RPC functions. Used for offline runs (`--fixture`) and as the
//! mock in tests: it counts calls and can be switched into a failing mode.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use super::{FetchError, SignalSource};
use crate::domain::{Direction, Signal, TraderId, UserId};

/// On-disk fixture format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub signals: Vec<Signal>,
    /// user id -> subscribed trader ids
    #[serde(default)]
    pub subscriptions: BTreeMap<String, Vec<TraderId>>,
    /// user id -> followed trader ids
    #[serde(default)]
    pub follows: BTreeMap<String, Vec<TraderId>>,
}

/// In-memory `SignalSource`.
#[derive(Debug, Default)]
pub struct InMemorySource {
    signals: RwLock<Vec<Signal>>,
    subscriptions: BTreeMap<String, Vec<TraderId>>,
    follows: BTreeMap<String, Vec<TraderId>>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl InMemorySource {
    pub fn new(signals: Vec<Signal>) -> Self {
        Self::from_fixture(Fixture {
            signals,
            ..Fixture::default()
        })
    }

    pub fn from_fixture(fixture: Fixture) -> Self {
        Self {
            signals: RwLock::new(fixture.signals),
            subscriptions: fixture.subscriptions,
            follows: fixture.follows,
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Load a JSON fixture file.
    pub fn from_json_file(path: &Path) -> Result<Self, FetchError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| FetchError::Fixture(format!("{}: {e}", path.display())))?;
        let fixture: Fixture = serde_json::from_str(&data)
            .map_err(|e| FetchError::Fixture(format!("{}: {e}", path.display())))?;
        tracing::debug!(
            path = %path.display(),
            signals = fixture.signals.len(),
            "loaded signal fixture"
        );
        Ok(Self::from_fixture(fixture))
    }

    pub fn with_subscriptions(mut self, user: &str, traders: &[&str]) -> Self {
        self.subscriptions
            .insert(user.to_string(), traders.iter().map(|t| TraderId::from(*t)).collect());
        self
    }

    pub fn with_follows(mut self, user: &str, traders: &[&str]) -> Self {
        self.follows
            .insert(user.to_string(), traders.iter().map(|t| TraderId::from(*t)).collect());
        self
    }

    /// Add a signal as if the backend had just published it.
    pub fn publish(&self, signal: Signal) {
        self.signals
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .push(signal);
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of calls made so far, across all four functions.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(FetchError::Network("simulated outage".into()));
        }
        Ok(())
    }

    fn query(&self, direction: Option<Direction>, max_count: usize) -> Vec<Signal> {
        let signals = self.signals.read().unwrap_or_else(|p| p.into_inner());
        let mut matching: Vec<Signal> = signals
            .iter()
            .filter(|s| s.is_active())
            .filter(|s| direction.map_or(true, |d| s.direction == d))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.signal_time.cmp(&a.signal_time));
        matching.truncate(max_count);
        matching
    }
}

impl SignalSource for InMemorySource {
    fn name(&self) -> &str {
        "fixture"
    }

    fn fetch_active_signals(&self, max_count: usize) -> Result<Vec<Signal>, FetchError> {
        self.enter()?;
        Ok(self.query(None, max_count))
    }

    fn fetch_signals_by_direction(
        &self,
        direction: Direction,
        max_count: usize,
    ) -> Result<Vec<Signal>, FetchError> {
        self.enter()?;
        Ok(self.query(Some(direction), max_count))
    }

    fn fetch_subscribed_trader_ids(&self, user: &UserId) -> Result<Vec<TraderId>, FetchError> {
        self.enter()?;
        Ok(self.subscriptions.get(user.as_str()).cloned().unwrap_or_default())
    }

    fn fetch_followed_trader_ids(&self, user: &UserId) -> Result<Vec<TraderId>, FetchError> {
        self.enter()?;
        Ok(self.follows.get(user.as_str()).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SignalId, SignalStatus};
    use chrono::{TimeZone, Utc};

    fn signal(id: u32, direction: Direction, status: SignalStatus) -> Signal {
        Signal {
            id: SignalId::new(format!("s{id}")),
            trader_id: TraderId::from("t1"),
            pair: "ETH/USDT".into(),
            direction,
            entry_price: Some("3100".into()),
            stop_loss: None,
            take_profit: None,
            leverage: None,
            status,
            signal_time: Utc.timestamp_opt(1_700_000_000 + i64::from(id) * 60, 0).unwrap(),
        }
    }

    #[test]
    fn active_query_is_newest_first_and_truncated() {
        let source = InMemorySource::new(vec![
            signal(1, Direction::Long, SignalStatus::Active),
            signal(2, Direction::Short, SignalStatus::Closed),
            signal(3, Direction::Short, SignalStatus::Active),
            signal(4, Direction::Long, SignalStatus::Active),
        ]);
        let got = source.fetch_active_signals(2).unwrap();
        let ids: Vec<&str> = got.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s4", "s3"]);
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn direction_query_filters() {
        let source = InMemorySource::new(vec![
            signal(1, Direction::Long, SignalStatus::Active),
            signal(2, Direction::Short, SignalStatus::Active),
        ]);
        let got = source.fetch_signals_by_direction(Direction::Short, 10).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].direction, Direction::Short);
    }

    #[test]
    fn failing_mode() {
        let source = InMemorySource::default();
        source.set_failing(true);
        assert!(source.fetch_active_signals(5).is_err());
        source.set_failing(false);
        assert!(source.fetch_active_signals(5).unwrap().is_empty());
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn unknown_user_has_no_scope() {
        let source = InMemorySource::default().with_subscriptions("u1", &["t9"]);
        assert_eq!(
            source.fetch_subscribed_trader_ids(&UserId::from("u1")).unwrap(),
            vec![TraderId::from("t9")]
        );
        assert!(source.fetch_followed_trader_ids(&UserId::from("u1")).unwrap().is_empty());
        assert!(source.fetch_subscribed_trader_ids(&UserId::from("u2")).unwrap().is_empty());
    }

    #[test]
    fn loads_json_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.json");
        let fixture = Fixture {
            signals: vec![signal(1, Direction::Long, SignalStatus::Active)],
            subscriptions: BTreeMap::from([("u1".to_string(), vec![TraderId::from("t1")])]),
            follows: BTreeMap::new(),
        };
        std::fs::write(&path, serde_json::to_string(&fixture).unwrap()).unwrap();

        let source = InMemorySource::from_json_file(&path).unwrap();
        assert_eq!(source.fetch_active_signals(10).unwrap().len(), 1);

        let missing = InMemorySource::from_json_file(&dir.path().join("nope.json"));
        assert!(matches!(missing, Err(FetchError::Fixture(_))));
    }
}
