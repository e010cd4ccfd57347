//! CopyFeed Core: the signal feed behind the copy-trading client.
//!
//! This crate contains:
//! - Domain types (signals, directions, identifiers)
//! - Filter chips and their normalization rules
//! - Data-source contracts plus backend (RPC) and fixture implementations
//! - The feed state machine: pagination, dedupe, refresh, load-more
//! - Configuration and logging setup shared by the binaries

pub mod config;
pub mod domain;
pub mod feed;
pub mod filter;
pub mod logging;
pub mod source;

pub use config::{AppConfig, ConfigError};
pub use domain::{Direction, Signal, SignalId, SignalStatus, TraderId, UserId};
pub use feed::{CancelToken, Completion, FeedController, FeedState, LoadState};
pub use filter::{FilterSet, FilterTag};
pub use source::{FetchError, SessionProvider, SignalSource};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything the TUI moves to its worker thread is
    /// Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Signal>();
        require_sync::<Signal>();
        require_send::<FilterSet>();
        require_sync::<FilterSet>();
        require_send::<feed::LoadTicket>();
        require_sync::<feed::LoadTicket>();
        require_send::<feed::PageFetch>();
        require_sync::<feed::PageFetch>();
        require_send::<FetchError>();
        require_sync::<FetchError>();
        require_send::<CancelToken>();
        require_sync::<CancelToken>();
        require_send::<source::InMemorySource>();
        require_sync::<source::InMemorySource>();
        require_send::<source::RestSource>();
        require_sync::<source::RestSource>();
        require_send::<FeedState>();
        require_sync::<FeedState>();
    }

    /// Sources are used through `&self` only, so one shared source can back
    /// several threads at once.
    #[test]
    fn source_trait_objects_are_shareable() {
        use std::sync::Arc;

        let source: Arc<dyn SignalSource> = Arc::new(source::InMemorySource::new(Vec::new()));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let source = Arc::clone(&source);
                std::thread::spawn(move || source.fetch_active_signals(10))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(Vec::new()));
        }
        assert_eq!(source.name(), "fixture");
    }
}
