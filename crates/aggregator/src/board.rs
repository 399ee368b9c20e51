// crates/aggregator/src/board.rs
//! Merge and eviction rules for the job board.
//!
//! `JobBoard` is synchronous and clock-free: every operation takes `now`
//! explicitly and returns the timers the caller must arm or cancel. The
//! owning task (see `aggregator.rs`) turns those into real sleeps and feeds
//! expiries back through [`JobBoard::expire`].

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};
use jobwatch_types::{ActiveJob, ActivityEntry, BoardSnapshot, JobStatus, ProgressEvent};

use crate::config::AggregatorConfig;
use crate::error::MalformedEventError;

/// Identifier of one armed timer. Never reused within a board.
pub type TimerId = u64;

/// What a timer removes when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expiry {
    Activity { seq: u64 },
    Job { job_id: String },
}

/// A timer the owner must arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    pub id: TimerId,
    pub expiry: Expiry,
    pub after: Duration,
}

/// Timer changes produced by a board operation.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Effects {
    pub schedule: Vec<Timer>,
    pub cancel: Vec<TimerId>,
}

/// A validated event.
struct JobUpdate {
    job_id: String,
    name: Option<String>,
    status: JobStatus,
    progress: Option<u8>,
    message: Option<String>,
}

impl JobUpdate {
    fn from_event(event: &ProgressEvent) -> Result<Self, MalformedEventError> {
        let job_id = match event.job_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Err(MalformedEventError::MissingJobId),
        };
        let status = match event.status.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => JobStatus::from(s),
            _ => return Err(MalformedEventError::MissingStatus { job_id }),
        };
        Ok(Self {
            job_id,
            name: event.name.clone().filter(|n| !n.is_empty()),
            status,
            progress: event.progress.map(|p| p.clamp(0, 100) as u8),
            message: event.message.clone().filter(|m| !m.is_empty()),
        })
    }
}

struct TrackedJob {
    job: ActiveJob,
    /// Pending eviction timer, if the job is in an evictable status.
    eviction: Option<TimerId>,
}

struct TrackedEntry {
    entry: ActivityEntry,
    timer: TimerId,
}

/// The active-job table and the recent-activity feed.
pub struct JobBoard {
    config: AggregatorConfig,
    jobs: HashMap<String, TrackedJob>,
    /// Newest first.
    activity: VecDeque<TrackedEntry>,
    next_seq: u64,
    next_timer: TimerId,
}

fn bump(counter: &mut u64) -> u64 {
    let id = *counter;
    *counter += 1;
    id
}

fn evicts(config: &AggregatorConfig, status: &JobStatus) -> bool {
    match status {
        JobStatus::Completed => true,
        JobStatus::Failed => config.evict_failed,
        _ => false,
    }
}

impl JobBoard {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            config,
            jobs: HashMap::new(),
            activity: VecDeque::new(),
            next_seq: 1,
            next_timer: 1,
        }
    }

    /// Merge one event into both views.
    ///
    /// All-or-nothing: a malformed event returns an error before anything
    /// is touched.
    pub fn apply(
        &mut self,
        event: &ProgressEvent,
        now: DateTime<Utc>,
    ) -> Result<Effects, MalformedEventError> {
        let update = JobUpdate::from_event(event)?;
        let mut effects = Effects::default();

        let existing = self.jobs.get(&update.job_id).map(|t| &t.job);
        let progress = update
            .progress
            .or(existing.map(|j| j.progress))
            .unwrap_or(0);
        let name = update
            .name
            .clone()
            .or_else(|| existing.map(|j| j.name.clone()))
            .unwrap_or_else(|| update.job_id.clone());

        self.push_activity(&update, name.clone(), progress, now, &mut effects);

        let evictable = evicts(&self.config, &update.status);
        let completed_ttl = self.config.completed_ttl;
        match self.jobs.entry(update.job_id.clone()) {
            Entry::Vacant(slot) => {
                let eviction = evictable.then(|| {
                    let id = bump(&mut self.next_timer);
                    effects.schedule.push(Timer {
                        id,
                        expiry: Expiry::Job {
                            job_id: update.job_id.clone(),
                        },
                        after: completed_ttl,
                    });
                    id
                });
                slot.insert(TrackedJob {
                    job: ActiveJob {
                        job_id: update.job_id,
                        name,
                        end_time: update.status.is_terminal().then_some(now),
                        error_message: match update.status {
                            JobStatus::Failed => update.message,
                            _ => None,
                        },
                        status: update.status,
                        progress,
                        start_time: now,
                    },
                    eviction,
                });
            }
            Entry::Occupied(slot) => {
                let tracked = slot.into_mut();
                let was_evictable = evicts(&self.config, &tracked.job.status);
                let was_terminal = tracked.job.status.is_terminal();
                let job = &mut tracked.job;

                job.name = name;
                job.progress = progress;
                if update.status.is_terminal() {
                    if !was_terminal || job.end_time.is_none() {
                        job.end_time = Some(now);
                    }
                } else {
                    job.end_time = None;
                }
                match update.status {
                    JobStatus::Failed => {
                        if update.message.is_some() {
                            job.error_message = update.message;
                        }
                    }
                    _ => job.error_message = None,
                }
                job.status = update.status;

                match (was_evictable, evictable) {
                    (false, true) => {
                        if let Some(old) = tracked.eviction.take() {
                            effects.cancel.push(old);
                        }
                        let id = bump(&mut self.next_timer);
                        tracked.eviction = Some(id);
                        effects.schedule.push(Timer {
                            id,
                            expiry: Expiry::Job {
                                job_id: job.job_id.clone(),
                            },
                            after: completed_ttl,
                        });
                    }
                    (true, false) => {
                        if let Some(old) = tracked.eviction.take() {
                            effects.cancel.push(old);
                        }
                    }
                    // Redelivered terminal event: the first deadline stands.
                    (true, true) | (false, false) => {}
                }
            }
        }

        Ok(effects)
    }

    fn push_activity(
        &mut self,
        update: &JobUpdate,
        name: String,
        progress: u8,
        now: DateTime<Utc>,
        effects: &mut Effects,
    ) {
        let seq = bump(&mut self.next_seq);
        let timer = bump(&mut self.next_timer);
        let message = update
            .message
            .clone()
            .unwrap_or_else(|| format!("{} - {}%", update.status, progress));

        self.activity.push_front(TrackedEntry {
            entry: ActivityEntry {
                seq,
                job_id: update.job_id.clone(),
                name,
                message,
                timestamp: now,
                is_completed: update.status == JobStatus::Completed,
            },
            timer,
        });
        effects.schedule.push(Timer {
            id: timer,
            expiry: Expiry::Activity { seq },
            after: self.config.activity_ttl,
        });

        while self.activity.len() > self.config.activity_cap {
            if let Some(dropped) = self.activity.pop_back() {
                effects.cancel.push(dropped.timer);
            }
        }
    }

    /// Handle a fired timer. Returns true when something was removed.
    ///
    /// A job is removed only if it is still present, still in an evictable
    /// status and still owns this timer; anything else means the timer was
    /// superseded and the fire is ignored.
    pub fn expire(&mut self, id: TimerId, expiry: &Expiry) -> bool {
        match expiry {
            Expiry::Activity { seq } => {
                match self
                    .activity
                    .iter()
                    .position(|t| t.entry.seq == *seq && t.timer == id)
                {
                    Some(index) => self.activity.remove(index).is_some(),
                    None => false,
                }
            }
            Expiry::Job { job_id } => {
                let live = self.jobs.get(job_id).is_some_and(|t| {
                    t.eviction == Some(id) && evicts(&self.config, &t.job.status)
                });
                if live {
                    self.jobs.remove(job_id);
                }
                live
            }
        }
    }

    /// Remove every Completed job now. Returns how many were removed and the
    /// timers that no longer have a target.
    pub fn clear_completed(&mut self) -> (usize, Effects) {
        let mut effects = Effects::default();
        let before = self.jobs.len();
        self.jobs.retain(|_, tracked| {
            if tracked.job.status == JobStatus::Completed {
                if let Some(id) = tracked.eviction {
                    effects.cancel.push(id);
                }
                false
            } else {
                true
            }
        });
        (before - self.jobs.len(), effects)
    }

    /// Active jobs ordered by start time, then job id.
    pub fn active_jobs(&self) -> Vec<ActiveJob> {
        let mut jobs: Vec<ActiveJob> = self.jobs.values().map(|t| t.job.clone()).collect();
        jobs.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        jobs
    }

    /// Recent activity, newest first.
    pub fn recent_activity(&self) -> Vec<ActivityEntry> {
        self.activity.iter().map(|t| t.entry.clone()).collect()
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            active_jobs: self.active_jobs(),
            recent_activity: self.recent_activity(),
        }
    }
}
