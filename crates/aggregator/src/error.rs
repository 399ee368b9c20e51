// crates/aggregator/src/error.rs
use thiserror::Error;

/// A progress event that cannot be applied to the board.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedEventError {
    #[error("progress event has no jobId")]
    MissingJobId,

    #[error("progress event for job {job_id} has no status")]
    MissingStatus { job_id: String },
}

/// Errors returned by [`JobStateAggregator`](crate::JobStateAggregator) operations.
#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("rejected event: {0}")]
    Malformed(#[from] MalformedEventError),

    #[error("job board has shut down")]
    Closed,
}
