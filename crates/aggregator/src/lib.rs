// crates/aggregator/src/lib.rs
//! Job state aggregation.
//!
//! Provides:
//! - `JobBoard`: pure merge/eviction state machine
//! - `JobStateAggregator`: task owning a `JobBoard`, its timers and its snapshot channel
//! - `AggregatorConfig`: caps and time windows

pub mod aggregator;
pub mod board;
pub mod config;
pub mod error;

pub use aggregator::JobStateAggregator;
pub use board::{Effects, Expiry, JobBoard, Timer, TimerId};
pub use config::AggregatorConfig;
pub use error::{AggregatorError, MalformedEventError};
