// crates/types/src/job.rs
//! Job views and submission payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::status::JobStatus;

/// A job currently shown on the board, keyed by `job_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct ActiveJob {
    pub job_id: String,
    pub name: String,
    #[ts(type = "string")]
    pub status: JobStatus,
    pub progress: u8,
    /// When the first event for this job was received. Never moves.
    #[ts(type = "string")]
    pub start_time: DateTime<Utc>,
    /// Set when the job reaches Completed or Failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// One line of the recent-activity feed. One entry per received event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    /// Monotonic per-board sequence number; the entry's identity.
    #[ts(type = "number")]
    pub seq: u64,
    pub job_id: String,
    pub name: String,
    pub message: String,
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
    pub is_completed: bool,
}

/// Both board views at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    /// Ordered by start time, then job id.
    pub active_jobs: Vec<ActiveJob>,
    /// Newest first.
    pub recent_activity: Vec<ActivityEntry>,
}

/// One job to be scheduled by the submission endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct JobConfiguration {
    pub name: String,
    pub duration_seconds: u32,
    /// Delay before the job starts; 0 means immediately.
    #[serde(default)]
    pub schedule_delay_seconds: u32,
}

/// Body of `POST {api}/jobs/submit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct JobSubmissionRequest {
    pub jobs: Vec<JobConfiguration>,
}
