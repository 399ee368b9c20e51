// crates/live/src/status.rs
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Where the update channel currently is in its connect/retry cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not started, or stopped.
    Disconnected,
    /// Socket connect or hub handshake in flight.
    Connecting,
    /// Waiting out the retry delay after a failure or a dropped connection.
    AwaitingRetry,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingRetry => "awaiting_retry",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state plus one unbounded queue per subscriber.
///
/// Every transition is pushed to every queue while the lock is held, so
/// each subscriber sees all transitions in the order they were applied,
/// however far behind it is.
///
/// Writers are tagged with the run generation handed out by
/// [`begin`](Self::begin); a run that has been superseded by a later
/// `start` can no longer change the state.
pub(crate) struct StatusCell {
    inner: Mutex<Inner>,
}

struct Inner {
    state: ConnectionState,
    generation: u64,
    subscribers: Vec<mpsc::UnboundedSender<ConnectionState>>,
}

impl Inner {
    fn transition(&mut self, next: ConnectionState) {
        if self.state == next {
            return;
        }
        debug!(from = %self.state, to = %next, "update channel state");
        self.state = next;
        self.subscribers.retain(|tx| tx.send(next).is_ok());
    }
}

impl StatusCell {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                generation: 0,
                subscribers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new run: move to Connecting and return the run's generation.
    pub(crate) fn begin(&self) -> u64 {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.transition(ConnectionState::Connecting);
        inner.generation
    }

    /// Record a transition for run `generation`. Repeating the current
    /// state, or writing from a superseded run, is a no-op.
    pub(crate) fn set(&self, generation: u64, next: ConnectionState) {
        let mut inner = self.lock();
        if inner.generation != generation {
            trace!(generation, current = inner.generation, %next, "ignoring stale state");
            return;
        }
        inner.transition(next);
    }

    pub(crate) fn get(&self) -> ConnectionState {
        self.lock().state
    }

    pub(crate) fn subscribe(&self) -> StatusStream {
        let mut inner = self.lock();
        let (tx, rx) = mpsc::unbounded_channel();
        // Receiver is alive, so this cannot fail.
        let _ = tx.send(inner.state);
        inner.subscribers.push(tx);
        StatusStream { rx }
    }
}

/// Connection state changes, starting with the state at subscription time.
pub struct StatusStream {
    rx: mpsc::UnboundedReceiver<ConnectionState>,
}

impl StatusStream {
    /// The next state, or `None` once the client is dropped and every
    /// queued transition has been read.
    pub async fn next(&mut self) -> Option<ConnectionState> {
        self.rx.recv().await
    }
}
