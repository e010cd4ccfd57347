use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{SignalId, TraderId};

/// Position bias of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStatus {
    Active,
    Closed,
    Cancelled,
}

impl SignalStatus {
    pub fn label(self) -> &'static str {
        match self {
            SignalStatus::Active => "active",
            SignalStatus::Closed => "closed",
            SignalStatus::Cancelled => "cancelled",
        }
    }
}

/// A single trading recommendation issued by a trader.
///
/// Created by the backend and never mutated client-side. Prices are kept as
/// decimal strings exactly as the backend sends them; `None` means the trader
/// did not provide the level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    pub trader_id: TraderId,
    #[serde(alias = "currency_pair")]
    pub pair: String,
    pub direction: Direction,
    #[serde(default)]
    pub entry_price: Option<String>,
    #[serde(default)]
    pub stop_loss: Option<String>,
    #[serde(default)]
    pub take_profit: Option<String>,
    #[serde(default)]
    pub leverage: Option<String>,
    pub status: SignalStatus,
    pub signal_time: DateTime<Utc>,
}

impl Signal {
    pub fn is_active(&self) -> bool {
        self.status == SignalStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_row() {
        let json = r#"{
            "id": "s1",
            "trader_id": "t1",
            "currency_pair": "BTC/USDT",
            "direction": "short",
            "entry_price": "64250.5",
            "stop_loss": null,
            "status": "active",
            "signal_time": "2024-03-01T12:00:00Z"
        }"#;
        let signal: Signal = serde_json::from_str(json).unwrap();
        assert_eq!(signal.pair, "BTC/USDT");
        assert_eq!(signal.direction, Direction::Short);
        assert_eq!(signal.entry_price.as_deref(), Some("64250.5"));
        assert!(signal.stop_loss.is_none());
        assert!(signal.take_profit.is_none());
        assert!(signal.is_active());
    }
}
