// crates/live/src/error.rs
use std::time::Duration;

use thiserror::Error;

/// Errors decoding hub records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("malformed hub record: {message}")]
    MalformedRecord { message: String },

    #[error("hub rejected handshake: {0}")]
    HandshakeRejected(String),

    #[error("empty handshake response")]
    EmptyHandshake,

    #[error("invocation {target} carried no arguments")]
    MissingArgument { target: String },
}

/// Connection-level failures. All of them are transient: the client logs
/// them and retries.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("timed out after {0:?} connecting to the hub")]
    Timeout(Duration),

    #[error("no message from the hub for {0:?}")]
    ServerTimeout(Duration),

    #[error("hub connection closed: {reason}")]
    Closed { reason: String },

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ConnectionError {
    pub fn closed(reason: impl Into<String>) -> Self {
        Self::Closed {
            reason: reason.into(),
        }
    }
}
