//! Identifier-keyed merging of signal pages.

use std::collections::{HashMap, HashSet};

use crate::domain::{Signal, SignalId};

/// Drop repeated identifiers, keeping the first position and the last value.
pub fn dedupe_last_wins(signals: impl IntoIterator<Item = Signal>) -> Vec<Signal> {
    let mut out: Vec<Signal> = Vec::new();
    let mut index: HashMap<SignalId, usize> = HashMap::new();
    for signal in signals {
        match index.get(&signal.id) {
            Some(&i) => out[i] = signal,
            None => {
                index.insert(signal.id.clone(), out.len());
                out.push(signal);
            }
        }
    }
    out
}

/// Merge the long and short fetches into one newest-first list.
///
/// The result does not depend on which fetch finished first: entries are keyed
/// by id and then stably sorted by `signal_time` descending.
pub fn merge_directions(long: Vec<Signal>, short: Vec<Signal>) -> Vec<Signal> {
    let mut merged = dedupe_last_wins(long.into_iter().chain(short));
    merged.sort_by(|a, b| b.signal_time.cmp(&a.signal_time));
    merged
}

/// Append the fetched signals whose ids are not displayed yet, in fetched
/// order. Returns how many were appended.
pub fn append_unseen(displayed: &mut Vec<Signal>, fetched: Vec<Signal>) -> usize {
    let mut seen: HashSet<SignalId> = displayed.iter().map(|s| s.id.clone()).collect();
    let before = displayed.len();
    for signal in fetched {
        if seen.insert(signal.id.clone()) {
            displayed.push(signal);
        }
    }
    displayed.len() - before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, SignalStatus, TraderId};
    use chrono::{TimeZone, Utc};

    fn signal(id: &str, minute: i64, direction: Direction) -> Signal {
        Signal {
            id: SignalId::from(id),
            trader_id: TraderId::from("t1"),
            pair: "SOL/USDT".into(),
            direction,
            entry_price: None,
            stop_loss: None,
            take_profit: None,
            leverage: Some("5x".into()),
            status: SignalStatus::Active,
            signal_time: Utc.timestamp_opt(1_700_000_000 + minute * 60, 0).unwrap(),
        }
    }

    #[test]
    fn dedupe_keeps_first_slot_last_value() {
        let mut updated = signal("a", 1, Direction::Long);
        updated.pair = "BTC/USDT".into();
        let out = dedupe_last_wins(vec![
            signal("a", 1, Direction::Long),
            signal("b", 2, Direction::Long),
            updated,
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id.as_str(), "a");
        assert_eq!(out[0].pair, "BTC/USDT");
    }

    #[test]
    fn merge_sorts_newest_first() {
        let long = vec![signal("l2", 20, Direction::Long), signal("l1", 5, Direction::Long)];
        let short = vec![signal("s1", 10, Direction::Short), signal("s2", 30, Direction::Short)];
        let merged = merge_directions(long, short);
        let ids: Vec<&str> = merged.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s2", "l2", "s1", "l1"]);
    }

    #[test]
    fn merge_is_order_independent() {
        let long = vec![signal("x", 3, Direction::Long), signal("y", 1, Direction::Long)];
        let short = vec![signal("z", 2, Direction::Short)];
        assert_eq!(
            merge_directions(long.clone(), short.clone()),
            merge_directions(short, long)
        );
    }

    #[test]
    fn append_skips_known_and_repeated_ids() {
        let mut shown = vec![signal("a", 3, Direction::Long), signal("b", 2, Direction::Long)];
        let added = append_unseen(
            &mut shown,
            vec![
                signal("a", 3, Direction::Long),
                signal("c", 1, Direction::Long),
                signal("c", 1, Direction::Long),
            ],
        );
        assert_eq!(added, 1);
        let ids: Vec<&str> = shown.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
