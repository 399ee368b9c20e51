// crates/types/src/lib.rs
//! Types shared between the update channel, the job board and the
//! presentation layer.

pub mod event;
pub mod job;
pub mod status;

pub use event::ProgressEvent;
pub use job::{ActiveJob, ActivityEntry, BoardSnapshot, JobConfiguration, JobSubmissionRequest};
pub use status::JobStatus;

/// Environment variable holding the job API base URL.
pub const API_URL_ENV: &str = "JOBWATCH_API_URL";

/// Environment variable holding the progress hub URL.
pub const HUB_URL_ENV: &str = "JOBWATCH_HUB_URL";

/// API base URL used when `JOBWATCH_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
