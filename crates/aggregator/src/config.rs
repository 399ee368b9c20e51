// crates/aggregator/src/config.rs
//! Job board tuning.

use std::time::Duration;

/// Configuration for a [`JobStateAggregator`](crate::JobStateAggregator).
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Maximum number of entries kept in the recent-activity feed.
    pub activity_cap: usize,
    /// How long an activity entry stays in the feed.
    pub activity_ttl: Duration,
    /// How long a finished job stays on the board.
    pub completed_ttl: Duration,
    /// Whether Failed jobs are evicted after `completed_ttl` like Completed ones.
    pub evict_failed: bool,
    /// Capacity of the command channel feeding the board task.
    pub command_buffer: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            activity_cap: 10,
            activity_ttl: Duration::from_secs(30),
            completed_ttl: Duration::from_secs(10),
            evict_failed: true,
            command_buffer: 256,
        }
    }
}
