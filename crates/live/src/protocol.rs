// crates/live/src/protocol.rs
//! JSON hub protocol framing.
//!
//! Every record is a JSON object followed by the ASCII record separator
//! (0x1E). One WebSocket text frame may hold any number of records. The
//! first exchange on a new socket is the handshake: the client announces
//! `{"protocol":"json","version":1}` and the server replies `{}` or
//! `{"error": "..."}`.

use jobwatch_types::ProgressEvent;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ProtocolError;

pub const RECORD_SEPARATOR: char = '\u{1e}';

const TYPE_INVOCATION: u8 = 1;
const TYPE_PING: u8 = 6;
const TYPE_CLOSE: u8 = 7;

/// A decoded hub record.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    Invocation {
        target: String,
        arguments: Vec<Value>,
    },
    Ping,
    Close {
        error: Option<String>,
        allow_reconnect: bool,
    },
    /// Completions, stream items and anything newer; ignored by the client.
    Other { kind: u8 },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    arguments: Vec<Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    allow_reconnect: bool,
}

#[derive(Deserialize)]
struct HandshakeResponse {
    #[serde(default)]
    error: Option<String>,
}

/// The client's opening record.
pub fn handshake_request() -> String {
    format!(r#"{{"protocol":"json","version":1}}{RECORD_SEPARATOR}"#)
}

/// Keep-alive record sent by the client.
pub fn ping_record() -> String {
    format!(r#"{{"type":{TYPE_PING}}}{RECORD_SEPARATOR}"#)
}

/// Record bodies in a frame, without separators. Blank chunks are skipped.
pub fn split_records(frame: &str) -> impl Iterator<Item = &str> {
    frame
        .split(RECORD_SEPARATOR)
        .map(str::trim)
        .filter(|record| !record.is_empty())
}

pub fn parse_record(record: &str) -> Result<HubMessage, ProtocolError> {
    let raw: RawRecord =
        serde_json::from_str(record).map_err(|e| ProtocolError::MalformedRecord {
            message: e.to_string(),
        })?;
    Ok(match raw.kind {
        TYPE_INVOCATION => HubMessage::Invocation {
            target: raw.target.ok_or_else(|| ProtocolError::MalformedRecord {
                message: "invocation without target".into(),
            })?,
            arguments: raw.arguments,
        },
        TYPE_PING => HubMessage::Ping,
        TYPE_CLOSE => HubMessage::Close {
            error: raw.error,
            allow_reconnect: raw.allow_reconnect,
        },
        kind => HubMessage::Other { kind },
    })
}

/// Decode every record in a frame. A bad record does not affect its
/// neighbours.
pub fn parse_records(frame: &str) -> Vec<Result<HubMessage, ProtocolError>> {
    split_records(frame).map(parse_record).collect()
}

/// Check the handshake response at the start of `frame` and return whatever
/// follows it in the same frame.
pub fn parse_handshake(frame: &str) -> Result<&str, ProtocolError> {
    let (head, rest) = match frame.split_once(RECORD_SEPARATOR) {
        Some((head, rest)) => (head, rest),
        None => (frame, ""),
    };
    let head = head.trim();
    if head.is_empty() {
        return Err(ProtocolError::EmptyHandshake);
    }
    let response: HandshakeResponse =
        serde_json::from_str(head).map_err(|e| ProtocolError::MalformedRecord {
            message: e.to_string(),
        })?;
    match response.error {
        Some(error) => Err(ProtocolError::HandshakeRejected(error)),
        None => Ok(rest),
    }
}

/// Decode the first invocation argument as a progress event.
pub fn decode_progress(target: &str, arguments: &[Value]) -> Result<ProgressEvent, ProtocolError> {
    let first = arguments
        .first()
        .ok_or_else(|| ProtocolError::MissingArgument {
            target: target.to_string(),
        })?;
    ProgressEvent::deserialize(first).map_err(|e| ProtocolError::MalformedRecord {
        message: e.to_string(),
    })
}
