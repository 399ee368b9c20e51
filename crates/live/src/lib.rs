// crates/live/src/lib.rs
//! Live-update channel client.
//!
//! Keeps one connection to the job progress hub alive, retrying forever
//! with fixed delays, and republishes decoded `ProgressEvent`s to any number
//! of subscribers.

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod status;
pub mod transport;

pub use client::UpdateChannelClient;
pub use config::{hub_url_from_api, ChannelConfig};
pub use error::{ConnectionError, ProtocolError};
pub use protocol::HubMessage;
pub use status::{ConnectionState, StatusStream};
pub use transport::{Connector, HubSession, WsConnector, WsSession};
