//! Background worker thread: every remote call runs here.
//!
//! Communication with the TUI main thread is via `mpsc` channels. The main
//! thread owns the feed state; the worker only ever sees a `LoadTicket` and
//! hands the ticket back with its result so the state can discard stale pages.

use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use copyfeed_core::feed::{fetch_page, CancelToken, LoadTicket, PageFetch, ScopeFallback};
use copyfeed_core::source::{FetchError, SessionProvider, SignalSource};

/// Commands sent from the TUI to the worker.
#[derive(Debug)]
pub enum WorkerCommand {
    Load(LoadTicket),
    Shutdown,
}

/// Responses sent from the worker back to the TUI.
#[derive(Debug)]
pub enum WorkerResponse {
    Page {
        ticket: LoadTicket,
        result: Result<PageFetch, FetchError>,
    },
}

/// What the worker fetches from.
#[derive(Clone)]
pub struct FeedBackend {
    pub source: Arc<dyn SignalSource>,
    pub session: Arc<dyn SessionProvider>,
    pub fallback: ScopeFallback,
}

/// Spawn the background worker thread.
pub fn spawn_worker(
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
    backend: FeedBackend,
    cancel: CancelToken,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("copyfeed-worker".into())
        .spawn(move || {
            worker_loop(rx, tx, backend, cancel);
        })
        .expect("failed to spawn worker thread")
}

fn worker_loop(
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
    backend: FeedBackend,
    cancel: CancelToken,
) {
    tracing::debug!(source = backend.source.name(), "worker started");
    loop {
        let ticket = match rx.recv() {
            Ok(WorkerCommand::Load(ticket)) => ticket,
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
        };

        let (ticket, shutdown) = latest_ticket(ticket, &rx);
        handle_load(ticket, &tx, &backend, &cancel);
        if shutdown {
            break;
        }
    }
    tracing::debug!("worker stopped");
}

/// Skip queued loads that a newer ticket already superseded.
///
/// Returns the newest ticket and whether a shutdown was queued behind it.
fn latest_ticket(mut ticket: LoadTicket, rx: &Receiver<WorkerCommand>) -> (LoadTicket, bool) {
    loop {
        match rx.try_recv() {
            Ok(WorkerCommand::Load(next)) => {
                tracing::trace!(
                    skipped = ticket.generation,
                    newer = next.generation,
                    "coalescing queued load"
                );
                ticket = next;
            }
            Ok(WorkerCommand::Shutdown) | Err(TryRecvError::Disconnected) => return (ticket, true),
            Err(TryRecvError::Empty) => return (ticket, false),
        }
    }
}

fn handle_load(
    ticket: LoadTicket,
    tx: &Sender<WorkerResponse>,
    backend: &FeedBackend,
    cancel: &CancelToken,
) {
    if cancel.is_cancelled() {
        return;
    }

    let result = fetch_page(
        backend.source.as_ref(),
        backend.session.as_ref(),
        &ticket.request,
        cancel,
        backend.fallback,
    );

    // The screen is gone; nobody will read the page.
    if cancel.is_cancelled() {
        tracing::debug!(generation = ticket.generation, "discarding page after cancel");
        return;
    }

    let _ = tx.send(WorkerResponse::Page { ticket, result });
}
