// crates/jobs/src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("a submission is already in flight")]
    InFlight,

    #[error("{0} job(s) still active on the board")]
    JobsActive(usize),

    #[error("invalid job batch: {0}")]
    Invalid(String),

    #[error("job API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("job API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

impl SubmissionError {
    /// Rejected locally, before any request was made.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::InFlight | Self::JobsActive(_) | Self::Invalid(_))
    }
}
