// crates/jobs/src/orchestrator.rs
//! Submission guard in front of the job API.
//!
//! A batch goes out only when nothing else is in flight and the board shows
//! no active jobs. There is no retry: a failed submission is reported and
//! the caller decides.

use std::sync::atomic::{AtomicBool, Ordering};

use jobwatch_aggregator::JobStateAggregator;
use jobwatch_types::{JobConfiguration, JobSubmissionRequest};
use serde_json::Value;
use tracing::{info, warn};

use crate::api::{HttpJobApi, JobApi};
use crate::error::SubmissionError;
use crate::plan::{plan_jobs, validate_jobs};

pub struct JobOrchestrator<A: JobApi = HttpJobApi> {
    api: A,
    board: JobStateAggregator,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when the submission finishes, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<A: JobApi> JobOrchestrator<A> {
    pub fn new(api: A, board: JobStateAggregator) -> Self {
        Self {
            api,
            board,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Submit a batch. Rejected without a request while another submission
    /// is outstanding, while the board lists active jobs, or when the batch
    /// is empty or has a zero-duration job.
    pub async fn submit(&self, jobs: Vec<JobConfiguration>) -> Result<Value, SubmissionError> {
        let _guard = InFlight::acquire(&self.in_flight).ok_or(SubmissionError::InFlight)?;

        let active = self.board.active_jobs().len();
        if active > 0 {
            return Err(SubmissionError::JobsActive(active));
        }
        validate_jobs(&jobs)?;

        let count = jobs.len();
        let request = JobSubmissionRequest { jobs };
        match self.api.submit(&request).await {
            Ok(response) => {
                info!(count, "jobs submitted");
                Ok(response)
            }
            Err(e) => {
                warn!(error = %e, count, "job submission failed");
                Err(e)
            }
        }
    }

    /// Submit the standard staggered batch of `count` jobs.
    pub async fn submit_planned(&self, count: usize) -> Result<Value, SubmissionError> {
        self.submit(plan_jobs(count)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use jobwatch_aggregator::AggregatorConfig;
    use jobwatch_types::{ActiveJob, ProgressEvent};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct FakeApi {
        calls: std::sync::Mutex<Vec<JobSubmissionRequest>>,
        /// When set, `submit` waits for a notification before answering.
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl JobApi for FakeApi {
        async fn submit(&self, request: &JobSubmissionRequest) -> Result<Value, SubmissionError> {
            self.calls.lock().unwrap().push(request.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(serde_json::json!({"accepted": request.jobs.len()}))
        }

        async fn job_status(&self) -> Result<Vec<ActiveJob>, SubmissionError> {
            Ok(Vec::new())
        }
    }

    fn board() -> JobStateAggregator {
        JobStateAggregator::spawn(AggregatorConfig::default())
    }

    #[tokio::test]
    async fn test_submit_sends_batch() {
        let board = board();
        let orchestrator = JobOrchestrator::new(FakeApi::default(), board.clone());

        let response = orchestrator.submit_planned(3).await.unwrap();
        assert_eq!(response["accepted"], 3);
        let calls = orchestrator.api.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].jobs, plan_jobs(3));
        drop(calls);
        assert!(!orchestrator.is_submitting());
        board.shutdown().await;
    }

    #[tokio::test]
    async fn test_submit_rejected_while_jobs_active() {
        let board = board();
        board
            .on_event(ProgressEvent::new("a", "Red Job", "Running", 10))
            .await
            .unwrap();
        let orchestrator = JobOrchestrator::new(FakeApi::default(), board.clone());

        let err = orchestrator.submit_planned(2).await.unwrap_err();
        assert!(matches!(err, SubmissionError::JobsActive(1)));
        assert!(err.is_rejected());
        assert!(orchestrator.api.calls.lock().unwrap().is_empty());
        // The rejection released the guard.
        assert!(!orchestrator.is_submitting());
        board.shutdown().await;
    }

    #[tokio::test]
    async fn test_submit_rejected_while_in_flight() {
        let board = board();
        let gate = Arc::new(Notify::new());
        let api = FakeApi {
            gate: Some(gate.clone()),
            ..Default::default()
        };
        let orchestrator = Arc::new(JobOrchestrator::new(api, board.clone()));

        let first = tokio::spawn({
            let orchestrator = orchestrator.clone();
            async move { orchestrator.submit_planned(1).await }
        });
        while !orchestrator.is_submitting() {
            tokio::task::yield_now().await;
        }

        let err = orchestrator.submit_planned(1).await.unwrap_err();
        assert!(matches!(err, SubmissionError::InFlight));

        gate.notify_one();
        first.await.unwrap().unwrap();
        assert!(!orchestrator.is_submitting());
        assert_eq!(orchestrator.api.calls.lock().unwrap().len(), 1);
        board.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_batch_is_not_sent() {
        let board = board();
        let orchestrator = JobOrchestrator::new(FakeApi::default(), board.clone());
        assert!(matches!(
            orchestrator.submit(Vec::new()).await,
            Err(SubmissionError::Invalid(_))
        ));
        assert!(orchestrator.api.calls.lock().unwrap().is_empty());
        board.shutdown().await;
    }
}
