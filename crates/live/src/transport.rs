// crates/live/src/transport.rs
//! Connection seam between the reconnect loop and the wire.
//!
//! `UpdateChannelClient` only sees [`Connector`] and [`HubSession`]. The
//! production implementation speaks the JSON hub protocol over a
//! tokio-tungstenite WebSocket; tests substitute scripted sessions.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::config::{to_ws_scheme, ChannelConfig};
use crate::error::{ConnectionError, ProtocolError};
use crate::protocol::{self, HubMessage};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens hub sessions. Called once per connection attempt.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Session: HubSession;

    /// Connect and complete the handshake. Only a session that is ready to
    /// deliver messages counts as connected.
    async fn connect(&self) -> Result<Self::Session, ConnectionError>;
}

/// One established hub connection.
#[async_trait]
pub trait HubSession: Send + 'static {
    /// Next hub message. `None` means the peer ended the connection;
    /// `Err(ConnectionError::Protocol)` is a single undecodable record and
    /// the session stays usable; any other error ends the session.
    async fn recv(&mut self) -> Option<Result<HubMessage, ConnectionError>>;

    /// Close politely. Errors are ignored.
    async fn close(&mut self);
}

/// WebSocket connector for the JSON hub protocol.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
    handshake_timeout: Duration,
    keepalive_interval: Duration,
    server_timeout: Duration,
}

impl WsConnector {
    pub fn new(config: &ChannelConfig) -> Self {
        Self {
            url: to_ws_scheme(&config.hub_url),
            handshake_timeout: config.handshake_timeout,
            keepalive_interval: config.keepalive_interval,
            server_timeout: config.server_timeout,
        }
    }

    async fn open(&self) -> Result<(Socket, VecDeque<Result<HubMessage, ProtocolError>>), ConnectionError> {
        let (mut socket, _response) = connect_async(self.url.as_str()).await?;
        socket
            .send(Message::Text(protocol::handshake_request().into()))
            .await?;

        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => {
                    let rest = protocol::parse_handshake(text.as_str())?;
                    let pending = protocol::parse_records(rest).into_iter().collect();
                    return Ok((socket, pending));
                }
                Some(Ok(Message::Close(frame))) => {
                    return Err(ConnectionError::closed(close_reason(frame.as_ref())));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => return Err(ConnectionError::closed("connection ended during handshake")),
            }
        }
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Session = WsSession;

    async fn connect(&self) -> Result<WsSession, ConnectionError> {
        debug!(url = %self.url, "connecting to progress hub");
        let (socket, pending) = tokio::time::timeout(self.handshake_timeout, self.open())
            .await
            .map_err(|_| ConnectionError::Timeout(self.handshake_timeout))??;

        let now = Instant::now();
        let mut keepalive =
            tokio::time::interval_at(now + self.keepalive_interval, self.keepalive_interval);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Ok(WsSession {
            socket,
            pending,
            keepalive,
            server_timeout: self.server_timeout,
            last_seen: now,
        })
    }
}

/// A WebSocket hub connection after a successful handshake.
pub struct WsSession {
    socket: Socket,
    /// Decoded records not yet handed out; one frame may carry several.
    pending: VecDeque<Result<HubMessage, ProtocolError>>,
    keepalive: Interval,
    server_timeout: Duration,
    last_seen: Instant,
}

#[async_trait]
impl HubSession for WsSession {
    async fn recv(&mut self) -> Option<Result<HubMessage, ConnectionError>> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(record.map_err(ConnectionError::from));
            }

            let deadline = self.last_seen + self.server_timeout;
            tokio::select! {
                frame = self.socket.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        self.last_seen = Instant::now();
                        self.pending.extend(protocol::parse_records(text.as_str()));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        return Some(Err(ConnectionError::closed(close_reason(frame.as_ref()))));
                    }
                    Some(Ok(_)) => {
                        self.last_seen = Instant::now();
                    }
                    Some(Err(e)) => return Some(Err(e.into())),
                    None => return None,
                },
                _ = self.keepalive.tick() => {
                    trace!("sending hub keepalive");
                    if let Err(e) = self
                        .socket
                        .send(Message::Text(protocol::ping_record().into()))
                        .await
                    {
                        return Some(Err(e.into()));
                    }
                }
                _ = tokio::time::sleep_until(deadline) => {
                    return Some(Err(ConnectionError::ServerTimeout(self.server_timeout)));
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.socket.close(None).await {
            trace!(error = %e, "hub close handshake failed");
        }
    }
}

fn close_reason(frame: Option<&CloseFrame>) -> String {
    match frame {
        Some(frame) if !frame.reason.is_empty() => {
            format!("{} ({})", frame.reason.as_str(), u16::from(frame.code))
        }
        Some(frame) => format!("close code {}", u16::from(frame.code)),
        None => "peer closed the socket".into(),
    }
}
