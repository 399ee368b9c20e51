// crates/jobs/src/lib.rs
//! Job submission: staggered job plans, the HTTP job API and the
//! orchestrator that guards submissions against the live board.

pub mod api;
pub mod error;
pub mod orchestrator;
pub mod plan;

pub use api::{HttpJobApi, JobApi};
pub use error::SubmissionError;
pub use orchestrator::JobOrchestrator;
pub use plan::{plan_jobs, validate_jobs, JOB_NAMES};
