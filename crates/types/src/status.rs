// crates/types/src/status.rs
//! Job status as reported by the update source.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a job.
///
/// The wire carries a free-form string; the four known values map to their
/// variants and anything else is kept verbatim in `Unknown`. Matching is exact:
/// `"completed"` is `Unknown("completed")`, not `Completed`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Scheduled,
    Running,
    Completed,
    Failed,
    Unknown(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Scheduled => "Scheduled",
            JobStatus::Running => "Running",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
            JobStatus::Unknown(s) => s,
        }
    }

    /// Completed or Failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl From<&str> for JobStatus {
    fn from(s: &str) -> Self {
        match s {
            "Scheduled" => JobStatus::Scheduled,
            "Running" => JobStatus::Running,
            "Completed" => JobStatus::Completed,
            "Failed" => JobStatus::Failed,
            other => JobStatus::Unknown(other.to_string()),
        }
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match JobStatus::from(s.as_str()) {
            JobStatus::Unknown(_) => JobStatus::Unknown(s),
            known => known,
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Unknown(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_literals_map_to_variants() {
        assert_eq!(JobStatus::from("Scheduled"), JobStatus::Scheduled);
        assert_eq!(JobStatus::from("Running"), JobStatus::Running);
        assert_eq!(JobStatus::from("Completed"), JobStatus::Completed);
        assert_eq!(JobStatus::from("Failed"), JobStatus::Failed);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert_eq!(
            JobStatus::from("completed"),
            JobStatus::Unknown("completed".into())
        );
        assert!(!JobStatus::from("completed").is_terminal());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&JobStatus::Completed).unwrap();
        assert_eq!(json, "\"Completed\"");
        let json = serde_json::to_string(&JobStatus::Unknown("Paused".into())).unwrap();
        assert_eq!(json, "\"Paused\"");

        let parsed: JobStatus = serde_json::from_str("\"Failed\"").unwrap();
        assert_eq!(parsed, JobStatus::Failed);
    }
}
