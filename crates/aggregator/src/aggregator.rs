// crates/aggregator/src/aggregator.rs
//! Single-writer task that owns the job board.
//!
//! Every mutation (incoming events, `clear_completed`, timer fires) is a
//! `Command` on one mpsc channel, handled in order by one task. Observers
//! read the latest `BoardSnapshot` from a watch channel that the task
//! updates after each mutation.

use std::collections::HashMap;

use chrono::Utc;
use jobwatch_types::{ActiveJob, ActivityEntry, BoardSnapshot, ProgressEvent};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, trace, warn};

use crate::board::{Effects, Expiry, JobBoard, Timer, TimerId};
use crate::config::AggregatorConfig;
use crate::error::{AggregatorError, MalformedEventError};

enum Command {
    Apply {
        event: ProgressEvent,
        reply: oneshot::Sender<Result<(), MalformedEventError>>,
    },
    ClearCompleted {
        reply: oneshot::Sender<usize>,
    },
    Expire {
        id: TimerId,
        expiry: Expiry,
    },
}

/// Handle to a running job board.
///
/// Cheap to clone; all clones talk to the same task. Call
/// [`shutdown`](Self::shutdown) to cancel pending timers and stop the task.
#[derive(Clone)]
pub struct JobStateAggregator {
    tx: mpsc::Sender<Command>,
    snapshot: watch::Receiver<BoardSnapshot>,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl JobStateAggregator {
    /// Spawn the board task. Must be called inside a tokio runtime.
    pub fn spawn(config: AggregatorConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.command_buffer.max(1));
        let (snapshot_tx, snapshot) = watch::channel(BoardSnapshot::default());
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();

        let actor = BoardActor {
            board: JobBoard::new(config),
            rx,
            self_tx: tx.downgrade(),
            snapshot_tx,
            timers: HashMap::new(),
            cancel: cancel.clone(),
            tracker: tracker.clone(),
        };
        tracker.spawn(actor.run());

        Self {
            tx,
            snapshot,
            cancel,
            tracker,
        }
    }

    /// Merge one progress event into the board.
    ///
    /// Returns `AggregatorError::Malformed` without changing anything when the
    /// event lacks a job id or a status.
    pub async fn on_event(&self, event: ProgressEvent) -> Result<(), AggregatorError> {
        apply(&self.tx, event).await
    }

    /// Remove every Completed job immediately. Returns the number removed.
    pub async fn clear_completed(&self) -> Result<usize, AggregatorError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::ClearCompleted { reply })
            .await
            .map_err(|_| AggregatorError::Closed)?;
        rx.await.map_err(|_| AggregatorError::Closed)
    }

    /// Active jobs, ordered by start time.
    pub fn active_jobs(&self) -> Vec<ActiveJob> {
        self.snapshot.borrow().active_jobs.clone()
    }

    /// Recent activity, newest first.
    pub fn recent_activity(&self) -> Vec<ActivityEntry> {
        self.snapshot.borrow().recent_activity.clone()
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Observe the board. The receiver is marked changed after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<BoardSnapshot> {
        self.snapshot.clone()
    }

    /// Feed a progress event stream into the board, in order, until the
    /// stream closes or the board shuts down. The follower does not count as
    /// a handle: once every handle is dropped the board stops.
    pub fn follow(&self, mut events: broadcast::Receiver<ProgressEvent>) {
        let tx = self.tx.downgrade();
        let cancel = self.cancel.clone();
        self.tracker.spawn(async move {
            loop {
                let received = tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = events.recv() => received,
                };
                match received {
                    Ok(event) => {
                        let Some(tx) = tx.upgrade() else { break };
                        match apply(&tx, event).await {
                            Ok(()) => {}
                            Err(AggregatorError::Malformed(e)) => {
                                warn!(error = %e, "dropping malformed progress event");
                            }
                            Err(AggregatorError::Closed) => break,
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "job board lagged behind the update stream");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("progress event follower stopped");
        });
    }

    /// Cancel all pending timers and followers, stop the board task and wait
    /// for every task it spawned. The last snapshot stays readable.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

async fn apply(tx: &mpsc::Sender<Command>, event: ProgressEvent) -> Result<(), AggregatorError> {
    let (reply, rx) = oneshot::channel();
    tx.send(Command::Apply { event, reply })
        .await
        .map_err(|_| AggregatorError::Closed)?;
    rx.await.map_err(|_| AggregatorError::Closed)??;
    Ok(())
}

struct BoardActor {
    board: JobBoard,
    rx: mpsc::Receiver<Command>,
    /// Weak so that armed timers do not keep the board alive.
    self_tx: mpsc::WeakSender<Command>,
    snapshot_tx: watch::Sender<BoardSnapshot>,
    timers: HashMap<TimerId, CancellationToken>,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl BoardActor {
    async fn run(mut self) {
        loop {
            let command = tokio::select! {
                _ = self.cancel.cancelled() => break,
                command = self.rx.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
            };
            self.handle(command);
        }
        // Children of the board token: stops every timer still armed.
        self.cancel.cancel();
        debug!(pending_timers = self.timers.len(), "job board stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Apply { event, reply } => {
                let result = self.board.apply(&event, Utc::now());
                match &result {
                    Ok(_) => trace!(job_id = ?event.job_id, status = ?event.status, "applied progress event"),
                    Err(e) => debug!(error = %e, "rejected progress event"),
                }
                let result = result.map(|effects| {
                    self.run_effects(effects);
                    self.publish();
                });
                let _ = reply.send(result);
            }
            Command::ClearCompleted { reply } => {
                let (removed, effects) = self.board.clear_completed();
                self.run_effects(effects);
                if removed > 0 {
                    debug!(removed, "cleared completed jobs");
                    self.publish();
                }
                let _ = reply.send(removed);
            }
            Command::Expire { id, expiry } => {
                self.timers.remove(&id);
                if self.board.expire(id, &expiry) {
                    trace!(?expiry, "evicted");
                    self.publish();
                }
            }
        }
    }

    fn run_effects(&mut self, effects: Effects) {
        for timer in effects.schedule {
            self.arm(timer);
        }
        for id in effects.cancel {
            if let Some(token) = self.timers.remove(&id) {
                token.cancel();
            }
        }
    }

    fn arm(&mut self, timer: Timer) {
        let Timer { id, expiry, after } = timer;
        let token = self.cancel.child_token();
        self.timers.insert(id, token.clone());

        let tx = self.self_tx.clone();
        self.tracker.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    if let Some(tx) = tx.upgrade() {
                        let _ = tx.send(Command::Expire { id, expiry }).await;
                    }
                }
            }
        });
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.board.snapshot());
    }
}
