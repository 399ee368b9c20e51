// crates/live/src/client.rs
//! Reconnecting update channel client.
//!
//! State machine:
//!
//! ```text
//! Disconnected --start--> Connecting --ok--> Connected
//!                             ^   |              |
//!                             |   err            lost
//!                             |   v              v
//!                             +-- AwaitingRetry <+
//! ```
//!
//! A failed attempt waits `connect_retry_delay` (5s) before the next one; a
//! dropped connection waits `reconnect_delay` (3s). Retries never give up.
//! `stop` cancels whichever phase is active and ends in `Disconnected`.

use std::sync::{Arc, Mutex, PoisonError};

use jobwatch_types::ProgressEvent;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::ChannelConfig;
use crate::error::ConnectionError;
use crate::protocol::{self, HubMessage};
use crate::status::{ConnectionState, StatusCell, StatusStream};
use crate::transport::{Connector, HubSession, WsConnector};

struct Shared<C> {
    connector: C,
    config: ChannelConfig,
    status: StatusCell,
    events: broadcast::Sender<ProgressEvent>,
}

struct Running {
    generation: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Keeps a hub connection alive and republishes progress events.
pub struct UpdateChannelClient<C: Connector = WsConnector> {
    shared: Arc<Shared<C>>,
    running: Mutex<Option<Running>>,
}

impl UpdateChannelClient<WsConnector> {
    pub fn new(config: ChannelConfig) -> Self {
        let connector = WsConnector::new(&config);
        Self::with_connector(connector, config)
    }
}

impl<C: Connector> UpdateChannelClient<C> {
    pub fn with_connector(connector: C, config: ChannelConfig) -> Self {
        let (events, _) = broadcast::channel(config.broadcast_capacity.max(1));
        let status = StatusCell::new();
        Self {
            shared: Arc::new(Shared {
                connector,
                config,
                status,
                events,
            }),
            running: Mutex::new(None),
        }
    }

    /// Begin connecting in the background. Calling it while already started
    /// does nothing. Must be called inside a tokio runtime.
    pub fn start(&self) {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.as_ref().is_some_and(|r| !r.task.is_finished()) {
            debug!("update channel already started");
            return;
        }

        let cancel = CancellationToken::new();
        // Visible to callers before `start` returns. Any task still winding
        // down from an earlier `stop` loses write access here.
        let generation = self.shared.status.begin();
        let task = tokio::spawn(run(self.shared.clone(), cancel.clone(), generation));
        *running = Some(Running {
            generation,
            cancel,
            task,
        });
    }

    /// Cancel any pending retry, close the connection and wait for the
    /// background task to finish. No events are published after this
    /// returns.
    pub async fn stop(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(Running {
            generation,
            cancel,
            task,
        }) = running
        {
            cancel.cancel();
            if let Err(e) = task.await {
                warn!(error = %e, "update channel task ended abnormally");
            }
            // No-op if `start` ran while we were waiting.
            self.shared.status.set(generation, ConnectionState::Disconnected);
        }
    }

    pub fn status(&self) -> ConnectionState {
        self.shared.status.get()
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// State transitions, starting with the current state.
    pub fn subscribe_status(&self) -> StatusStream {
        self.shared.status.subscribe()
    }

    /// Decoded progress events, in arrival order.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ProgressEvent> {
        self.shared.events.subscribe()
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.shared.config
    }
}

impl<C: Connector> Drop for UpdateChannelClient<C> {
    fn drop(&mut self) {
        let running = self
            .running
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(running) = running {
            running.cancel.cancel();
        }
    }
}

enum PumpExit {
    Stopped,
    Lost(String),
}

async fn run<C: Connector>(shared: Arc<Shared<C>>, cancel: CancellationToken, generation: u64) {
    let config = &shared.config;
    let status = &shared.status;
    loop {
        status.set(generation, ConnectionState::Connecting);
        let attempt = tokio::select! {
            _ = cancel.cancelled() => break,
            attempt = shared.connector.connect() => attempt,
        };

        let delay = match attempt {
            Ok(mut session) => {
                status.set(generation, ConnectionState::Connected);
                info!(hub = %config.hub_url, "connected to progress hub");
                match pump(&shared, &mut session, &cancel).await {
                    PumpExit::Stopped => {
                        session.close().await;
                        break;
                    }
                    PumpExit::Lost(reason) => {
                        warn!(
                            %reason,
                            retry_in = ?config.reconnect_delay,
                            "lost connection to progress hub"
                        );
                        config.reconnect_delay
                    }
                }
            }
            Err(e) => {
                warn!(
                    error = %e,
                    retry_in = ?config.connect_retry_delay,
                    "could not connect to progress hub"
                );
                config.connect_retry_delay
            }
        };

        status.set(generation, ConnectionState::AwaitingRetry);
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }
    status.set(generation, ConnectionState::Disconnected);
    debug!(generation, "update channel stopped");
}

async fn pump<C: Connector>(
    shared: &Shared<C>,
    session: &mut C::Session,
    cancel: &CancellationToken,
) -> PumpExit {
    let event_name = shared.config.event_name.as_str();
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return PumpExit::Stopped,
            next = session.recv() => next,
        };

        match next {
            None => return PumpExit::Lost("hub ended the connection".into()),
            Some(Err(ConnectionError::Protocol(e))) => {
                warn!(error = %e, "skipping undecodable hub record");
            }
            Some(Err(e)) => return PumpExit::Lost(e.to_string()),
            Some(Ok(HubMessage::Invocation { target, arguments })) => {
                if !target.eq_ignore_ascii_case(event_name) {
                    trace!(%target, "ignoring hub invocation");
                    continue;
                }
                match protocol::decode_progress(&target, &arguments) {
                    Ok(event) => {
                        trace!(job_id = ?event.job_id, status = ?event.status, "progress event");
                        // No subscribers is fine.
                        let _ = shared.events.send(event);
                    }
                    Err(e) => warn!(error = %e, "skipping malformed progress event"),
                }
            }
            Some(Ok(HubMessage::Close {
                error,
                allow_reconnect,
            })) => {
                let reason = error.unwrap_or_else(|| "no reason given".into());
                return PumpExit::Lost(format!(
                    "hub sent close: {reason} (allow_reconnect={allow_reconnect})"
                ));
            }
            Some(Ok(HubMessage::Ping)) => trace!("hub ping"),
            Some(Ok(HubMessage::Other { kind })) => trace!(kind, "ignoring hub record"),
        }
    }
}
