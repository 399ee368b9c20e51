//! Time-window behaviour of the job board, driven by tokio's paused clock.

use std::time::Duration;

use jobwatch_aggregator::{AggregatorConfig, AggregatorError, JobStateAggregator};
use jobwatch_types::{JobStatus, ProgressEvent};
use pretty_assertions::assert_eq;

fn board() -> JobStateAggregator {
    JobStateAggregator::spawn(AggregatorConfig::default())
}

async fn advance(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

#[tokio::test(start_paused = true)]
async fn red_job_scenario() {
    let board = board();
    board
        .on_event(ProgressEvent::new("a", "Red Job", "Running", 40))
        .await
        .unwrap();
    board
        .on_event(ProgressEvent {
            job_id: Some("a".into()),
            status: Some("Completed".into()),
            progress: Some(100),
            ..Default::default()
        })
        .await
        .unwrap();

    let jobs = board.active_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].job_id, "a");
    assert_eq!(jobs[0].progress, 100);
    assert_eq!(jobs[0].status, JobStatus::Completed);

    advance(11).await;
    assert!(board.active_jobs().is_empty());
    board.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn completed_job_stays_until_deadline() {
    let board = board();
    board
        .on_event(ProgressEvent::new("a", "A", "Completed", 100))
        .await
        .unwrap();

    advance(9).await;
    assert_eq!(board.active_jobs().len(), 1);
    advance(2).await;
    assert!(board.active_jobs().is_empty());
    board.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn revived_job_survives_original_deadline() {
    let board = board();
    board
        .on_event(ProgressEvent::new("a", "A", "Completed", 100))
        .await
        .unwrap();
    advance(5).await;
    board
        .on_event(ProgressEvent::new("a", "A", "Running", 20))
        .await
        .unwrap();

    advance(10).await;
    let jobs = board.active_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Running);
    board.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn recompleted_job_uses_new_deadline() {
    let board = board();
    board
        .on_event(ProgressEvent::new("a", "A", "Completed", 100))
        .await
        .unwrap();
    advance(3).await;
    board
        .on_event(ProgressEvent::new("a", "A", "Running", 50))
        .await
        .unwrap();
    advance(3).await;
    board
        .on_event(ProgressEvent::new("a", "A", "Completed", 100))
        .await
        .unwrap();

    // t=11: past the first deadline, before the second (t=16).
    advance(5).await;
    assert_eq!(board.active_jobs().len(), 1);
    advance(6).await;
    assert!(board.active_jobs().is_empty());
    board.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn duplicate_completed_does_not_extend_deadline() {
    let board = board();
    board
        .on_event(ProgressEvent::new("a", "A", "Completed", 100))
        .await
        .unwrap();
    advance(6).await;
    board
        .on_event(ProgressEvent::new("a", "A", "Completed", 100))
        .await
        .unwrap();
    advance(5).await;
    assert!(board.active_jobs().is_empty());
    board.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn start_time_is_fixed_at_first_event() {
    let board = board();
    board
        .on_event(ProgressEvent::new("a", "A", "Scheduled", 0))
        .await
        .unwrap();
    let first = board.active_jobs()[0].start_time;

    for progress in [10, 5, 80, 100] {
        tokio::time::sleep(Duration::from_millis(20)).await;
        board
            .on_event(ProgressEvent::new("a", "A", "Running", progress))
            .await
            .unwrap();
        assert_eq!(board.active_jobs()[0].start_time, first);
    }
    board.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn clear_completed_keeps_unfinished_jobs() {
    let board = board();
    board
        .on_event(ProgressEvent::new("fresh", "Fresh", "Running", 5))
        .await
        .unwrap();
    assert_eq!(board.clear_completed().await.unwrap(), 0);
    assert_eq!(board.active_jobs().len(), 1);

    board
        .on_event(ProgressEvent::new("done", "Done", "Completed", 100))
        .await
        .unwrap();
    assert_eq!(board.clear_completed().await.unwrap(), 1);
    let ids: Vec<_> = board.active_jobs().into_iter().map(|j| j.job_id).collect();
    assert_eq!(ids, vec!["fresh".to_string()]);

    // The cancelled eviction timer must not disturb a re-created job.
    board
        .on_event(ProgressEvent::new("done", "Done", "Running", 1))
        .await
        .unwrap();
    advance(11).await;
    assert_eq!(board.active_jobs().len(), 2);
    board.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn activity_feed_keeps_last_ten_newest_first() {
    let board = board();
    for i in 1..=15 {
        board
            .on_event(ProgressEvent::new(
                format!("job-{i}"),
                format!("Job {i}"),
                "Running",
                i,
            ))
            .await
            .unwrap();
        assert!(board.recent_activity().len() <= 10);
    }

    let names: Vec<_> = board
        .recent_activity()
        .into_iter()
        .map(|e| e.name)
        .collect();
    let expected: Vec<String> = (6..=15).rev().map(|i| format!("Job {i}")).collect();
    assert_eq!(names, expected);
    board.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn activity_entry_expires_after_thirty_seconds() {
    let board = board();
    board
        .on_event(ProgressEvent::new("a", "A", "Running", 10))
        .await
        .unwrap();
    advance(20).await;
    board
        .on_event(ProgressEvent::new("a", "A", "Running", 20))
        .await
        .unwrap();

    advance(11).await;
    let activity = board.recent_activity();
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0].message, "Running - 20%");

    advance(20).await;
    assert!(board.recent_activity().is_empty());
    // The running job itself is not time-limited.
    assert_eq!(board.active_jobs().len(), 1);
    board.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn malformed_event_leaves_views_unchanged() {
    let board = board();
    board
        .on_event(ProgressEvent::new("a", "A", "Running", 10))
        .await
        .unwrap();
    let before = board.snapshot();

    let result = board
        .on_event(ProgressEvent {
            name: Some("no id".into()),
            status: Some("Completed".into()),
            progress: Some(100),
            ..Default::default()
        })
        .await;
    assert!(matches!(result, Err(AggregatorError::Malformed(_))));

    let result = board
        .on_event(ProgressEvent {
            job_id: Some("a".into()),
            progress: Some(100),
            ..Default::default()
        })
        .await;
    assert!(matches!(result, Err(AggregatorError::Malformed(_))));

    assert_eq!(board.snapshot(), before);
    assert_eq!(
        serde_json::to_string(&board.snapshot()).unwrap(),
        serde_json::to_string(&before).unwrap()
    );
    board.shutdown().await;
}
