//! Domain types for the signal feed

pub mod ids;
pub mod signal;

pub use ids::{SignalId, TraderId, UserId};
pub use signal::{Direction, Signal, SignalStatus};
