//! Paginated, multi-filter signal feed.
//!
//! - `state`: the per-screen working set and its load state machine
//! - `fetch`: remote calls for one page (fan-out for long+short, scope filter)
//! - `merge`: identifier-keyed dedupe/merge helpers
//! - `controller`: synchronous composition of the three

pub mod controller;
pub mod fetch;
pub mod merge;
pub mod state;

pub use controller::FeedController;
pub use fetch::{fetch_page, CancelToken, PageFetch, PageRequest, ScopeFallback};
pub use merge::{append_unseen, dedupe_last_wins, merge_directions};
pub use state::{Completion, FeedFailure, FeedState, LoadKind, LoadState, LoadTicket, Notice};
