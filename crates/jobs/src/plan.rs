// crates/jobs/src/plan.rs
//! Staggered demo batches.

use jobwatch_types::JobConfiguration;

use crate::error::SubmissionError;

pub const JOB_NAMES: [&str; 6] = [
    "Red Job",
    "Blue Job",
    "Green Job",
    "Yellow Job",
    "Purple Job",
    "Orange Job",
];

/// Build `count` jobs (clamped to 1..=6). Job `i` (1-based) runs for
/// `15 + 5i` seconds and starts `5(i - 1)` seconds after submission.
pub fn plan_jobs(count: usize) -> Vec<JobConfiguration> {
    let count = count.clamp(1, JOB_NAMES.len());
    JOB_NAMES
        .iter()
        .take(count)
        .zip(1u32..)
        .map(|(name, i)| JobConfiguration {
            name: (*name).to_string(),
            duration_seconds: 15 + 5 * i,
            schedule_delay_seconds: 5 * (i - 1),
        })
        .collect()
}

pub fn validate_jobs(jobs: &[JobConfiguration]) -> Result<(), SubmissionError> {
    if jobs.is_empty() {
        return Err(SubmissionError::Invalid("no jobs".into()));
    }
    for job in jobs {
        if job.name.trim().is_empty() {
            return Err(SubmissionError::Invalid("job without a name".into()));
        }
        if job.duration_seconds == 0 {
            return Err(SubmissionError::Invalid(format!(
                "{} has a zero duration",
                job.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plan_is_staggered() {
        let jobs = plan_jobs(3);
        let summary: Vec<_> = jobs
            .iter()
            .map(|j| (j.name.as_str(), j.duration_seconds, j.schedule_delay_seconds))
            .collect();
        assert_eq!(
            summary,
            vec![("Red Job", 20, 0), ("Blue Job", 25, 5), ("Green Job", 30, 10)]
        );
    }

    #[test]
    fn test_plan_count_is_clamped() {
        assert_eq!(plan_jobs(0).len(), 1);
        let all = plan_jobs(42);
        assert_eq!(all.len(), 6);
        assert_eq!(all[5].name, "Orange Job");
        assert_eq!(all[5].duration_seconds, 45);
        assert_eq!(all[5].schedule_delay_seconds, 25);
    }

    #[test]
    fn test_validate_jobs() {
        assert!(validate_jobs(&plan_jobs(6)).is_ok());
        assert!(matches!(
            validate_jobs(&[]),
            Err(SubmissionError::Invalid(_))
        ));

        let mut jobs = plan_jobs(2);
        jobs[1].duration_seconds = 0;
        let err = validate_jobs(&jobs).unwrap_err();
        assert_eq!(err.to_string(), "invalid job batch: Blue Job has a zero duration");
    }
}
