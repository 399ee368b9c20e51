// crates/dashboard/src/render.rs
//! Plain-text rendering of board snapshots for the log output.

use chrono::{DateTime, Utc};
use jobwatch_types::{ActiveJob, ActivityEntry, BoardSnapshot};

const BAR_WIDTH: usize = 20;

pub fn progress_bar(progress: u8) -> String {
    let filled = usize::from(progress.min(100)) * BAR_WIDTH / 100;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

/// `Red Job      [########............]  40% Running (12s)`
pub fn job_line(job: &ActiveJob, now: DateTime<Utc>) -> String {
    let end = job.end_time.unwrap_or(now);
    let elapsed = (end - job.start_time).num_seconds().max(0);
    let mut line = format!(
        "{:<12} {} {:>3}% {} ({elapsed}s)",
        job.name,
        progress_bar(job.progress),
        job.progress,
        job.status
    );
    if let Some(error) = &job.error_message {
        line.push_str(": ");
        line.push_str(error);
    }
    line
}

pub fn activity_line(entry: &ActivityEntry) -> String {
    let marker = if entry.is_completed { '+' } else { '-' };
    format!(
        "{} {marker} {}: {}",
        entry.timestamp.format("%H:%M:%S"),
        entry.name,
        entry.message
    )
}

/// Activity entries newer than `last_seq`, oldest first.
pub fn new_activity(snapshot: &BoardSnapshot, last_seq: u64) -> Vec<&ActivityEntry> {
    let mut fresh: Vec<_> = snapshot
        .recent_activity
        .iter()
        .filter(|entry| entry.seq > last_seq)
        .collect();
    fresh.reverse();
    fresh
}

/// Whole-board summary, one job per line.
pub fn board_summary(snapshot: &BoardSnapshot, now: DateTime<Utc>) -> String {
    if snapshot.active_jobs.is_empty() {
        return "no active jobs".into();
    }
    snapshot
        .active_jobs
        .iter()
        .map(|job| job_line(job, now))
        .collect::<Vec<_>>()
        .join("\n")
}
