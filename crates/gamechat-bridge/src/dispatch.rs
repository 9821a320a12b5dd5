//! Hand-off from the connection loop to the chat platform
//!
//! Parsed events go through a bounded queue drained by a single worker task,
//! so a slow or unreachable chat platform never stalls socket reads. When
//! the queue is full the event is dropped and counted.

use async_trait::async_trait;
use gamechat_core::{Event, Result};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default number of events buffered between the socket and the dispatcher
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Chat-platform side of the bridge
///
/// Implement this trait to receive game events.
#[async_trait]
pub trait Dispatcher: Send + Sync + 'static {
    /// Whether the chat platform can take events yet.
    /// Events arriving before this returns true are dropped.
    fn is_ready(&self) -> bool {
        true
    }

    /// Deliver one event to the chat platform
    async fn dispatch(&self, event: Event) -> Result<()>;
}

/// Outcome of handing an event to the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Queued,
    /// Dispatcher not ready, event dropped
    NotReady,
    /// Queue full or worker gone, event dropped
    Dropped,
}

/// Counters describing queue health
#[derive(Debug, Default)]
pub struct DispatchStats {
    queued: AtomicU64,
    dispatched: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    not_ready: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSnapshot {
    pub queued: u64,
    pub dispatched: u64,
    pub failed: u64,
    pub dropped: u64,
    pub not_ready: u64,
}

impl DispatchSnapshot {
    /// Events accepted into the queue and not yet handled
    pub fn pending(&self) -> u64 {
        self.queued.saturating_sub(self.dispatched + self.failed)
    }
}

impl DispatchStats {
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            queued: self.queued.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            not_ready: self.not_ready.load(Ordering::Relaxed),
        }
    }
}

/// Sending side of the dispatch queue
#[derive(Clone)]
pub struct DispatchQueue {
    tx: mpsc::Sender<Event>,
    dispatcher: Arc<dyn Dispatcher>,
    stats: Arc<DispatchStats>,
}

impl DispatchQueue {
    /// Create the queue and spawn its worker task
    pub fn spawn(dispatcher: Arc<dyn Dispatcher>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let stats = Arc::new(DispatchStats::default());
        let handle = tokio::spawn(worker(rx, dispatcher.clone(), stats.clone()));
        (
            Self {
                tx,
                dispatcher,
                stats,
            },
            handle,
        )
    }

    /// Queue an event without waiting
    pub fn submit(&self, event: Event) -> SubmitOutcome {
        if !self.dispatcher.is_ready() {
            self.stats.not_ready.fetch_add(1, Ordering::Relaxed);
            warn!("Received {} event but dispatcher is not ready yet", event.kind());
            return SubmitOutcome::NotReady;
        }

        match self.tx.try_send(event) {
            Ok(()) => {
                self.stats.queued.fetch_add(1, Ordering::Relaxed);
                SubmitOutcome::Queued
            }
            Err(TrySendError::Full(event)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Dispatch queue full, dropping {} event", event.kind());
                SubmitOutcome::Dropped
            }
            Err(TrySendError::Closed(event)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Dispatch worker stopped, dropping {} event", event.kind());
                SubmitOutcome::Dropped
            }
        }
    }

    pub fn stats(&self) -> DispatchSnapshot {
        self.stats.snapshot()
    }
}

/// Worker that delivers queued events in order
async fn worker(
    mut rx: mpsc::Receiver<Event>,
    dispatcher: Arc<dyn Dispatcher>,
    stats: Arc<DispatchStats>,
) {
    while let Some(event) = rx.recv().await {
        let kind = event.kind();
        match dispatcher.dispatch(event).await {
            Ok(()) => {
                stats.dispatched.fetch_add(1, Ordering::Relaxed);
                debug!("Dispatched {} event", kind);
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!("Failed to dispatch {} event: {}", kind, e);
            }
        }
    }
    info!("Dispatch queue closed, worker exiting");
}
