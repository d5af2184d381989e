//! Job lifecycle specs
//!
//! Walks jobs through the status graph: dependency gating, failure and
//! retry, deactivation, and the re-arming cycle that follows a
//! dependent's completion.

use std::time::Duration;

use rota_core::{FakeClock, JobId, JobStatus};
use rota_engine::RUN_REFUSED;
use rota_store::MemoryStore;

use crate::prelude::*;

#[tokio::test]
async fn a_dependency_chain_runs_in_order() {
    let store = MemoryStore::new();
    let clock = FakeClock::new();
    let scheduler = fast_scheduler(&store, &clock);

    let extract = scheduler
        .create_job(job("extract", "echo rows", vec![]))
        .await
        .unwrap();
    let load = scheduler
        .create_job(job("load", "echo loaded", vec![extract.id]))
        .await
        .unwrap();

    // The consumer is gated until the producer has completed.
    let report = scheduler.run_job_now(load.id).await.unwrap();
    assert_eq!(report.code, RUN_REFUSED);
    assert_eq!(report.message, "Dependencies not complete");
    let load_job = scheduler.get_job(load.id).await.unwrap();
    assert_eq!(load_job.status, JobStatus::Scheduled, "a deferral leaves no trace");
    assert_eq!(load_job.run_count(), 0);

    let report = scheduler.run_job_now(extract.id).await.unwrap();
    assert_eq!(report.code, 0);
    assert_eq!(
        scheduler.job_status(extract.id).await.unwrap(),
        JobStatus::Complete
    );

    let report = scheduler.run_job_now(load.id).await.unwrap();
    assert_eq!(report.code, 0);
    assert_eq!(report.message, "Job executed");
    assert_eq!(
        scheduler.job_status(load.id).await.unwrap(),
        JobStatus::Complete
    );
    assert_eq!(
        scheduler.job_status(extract.id).await.unwrap(),
        JobStatus::Scheduled,
        "the consumer's completion should re-arm the producer"
    );
}

#[tokio::test]
async fn the_chain_repeats_after_rearming() {
    let store = MemoryStore::new();
    let clock = FakeClock::new();
    let scheduler = fast_scheduler(&store, &clock);

    let extract = scheduler
        .create_job(job("extract", "echo rows", vec![]))
        .await
        .unwrap();
    let load = scheduler
        .create_job(job("load", "echo loaded", vec![extract.id]))
        .await
        .unwrap();

    // First cycle.
    assert_eq!(scheduler.run_job_now(extract.id).await.unwrap().code, 0);
    assert_eq!(scheduler.run_job_now(load.id).await.unwrap().code, 0);

    // The producer was re-armed, so the consumer is gated again.
    let report = scheduler.run_job_now(load.id).await.unwrap();
    assert_eq!(report.code, RUN_REFUSED);
    assert_eq!(report.message, "Dependencies not complete");

    // Second cycle proceeds exactly like the first.
    assert_eq!(scheduler.run_job_now(extract.id).await.unwrap().code, 0);
    assert_eq!(scheduler.run_job_now(load.id).await.unwrap().code, 0);
    assert_eq!(
        scheduler.job_status(extract.id).await.unwrap(),
        JobStatus::Scheduled
    );
    assert_eq!(scheduler.get_job(load.id).await.unwrap().run_count(), 2);
}

#[tokio::test]
async fn a_failing_job_retries_on_the_next_trigger() {
    let store = MemoryStore::new();
    let clock = FakeClock::at(utc(2026, 3, 14, 12, 0, 0));
    let scheduler = fast_scheduler(&store, &clock);

    let flaky = scheduler
        .create_job(job("flaky", "exit 3", vec![]))
        .await
        .unwrap();
    scheduler.start().await.unwrap();

    clock.set(utc(2026, 3, 14, 12, 1, 1));
    assert!(wait_for_status(&scheduler, flaky.id, JobStatus::Failed).await);
    assert_eq!(scheduler.get_job(flaky.id).await.unwrap().run_count(), 1);

    // Failed jobs stay eligible, so the next boundary tries again.
    clock.set(utc(2026, 3, 14, 12, 2, 1));
    let retried = {
        let start = std::time::Instant::now();
        loop {
            if scheduler.get_job(flaky.id).await.unwrap().run_count() >= 2 {
                break true;
            }
            if start.elapsed() > Duration::from_millis(SPEC_WAIT_MAX_MS) {
                break false;
            }
            tokio::time::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
        }
    };
    assert!(retried, "a failed job should be retried on its next trigger");
    assert_eq!(
        scheduler.job_status(flaky.id).await.unwrap(),
        JobStatus::Failed
    );

    scheduler.stop().await;
}

#[tokio::test]
async fn fixing_a_failed_job_lets_it_complete() {
    let store = MemoryStore::new();
    let clock = FakeClock::new();
    let scheduler = fast_scheduler(&store, &clock);

    let flaky = scheduler
        .create_job(job("flaky", "exit 3", vec![]))
        .await
        .unwrap();

    let report = scheduler.run_job_now(flaky.id).await.unwrap();
    assert_eq!(report.code, RUN_REFUSED);
    assert_eq!(report.message, "Job failed");
    assert_eq!(
        scheduler.job_status(flaky.id).await.unwrap(),
        JobStatus::Failed
    );

    let mut fixed = scheduler.get_job(flaky.id).await.unwrap();
    fixed.command = "true".to_string();
    scheduler.update_job(&fixed).await.unwrap();

    let report = scheduler.run_job_now(flaky.id).await.unwrap();
    assert_eq!(report.code, 0, "the corrected command should succeed");
    assert_eq!(
        scheduler.job_status(flaky.id).await.unwrap(),
        JobStatus::Complete
    );
    assert_eq!(scheduler.get_job(flaky.id).await.unwrap().run_count(), 2);
}

#[tokio::test]
async fn deactivation_parks_a_job_until_rescheduled() {
    let store = MemoryStore::new();
    let clock = FakeClock::at(utc(2026, 3, 14, 12, 0, 0));
    let scheduler = fast_scheduler(&store, &clock);

    let etl = scheduler
        .create_job(job("etl", "echo tick", vec![]))
        .await
        .unwrap();
    scheduler
        .set_job_status(etl.id, JobStatus::Inactive)
        .await
        .unwrap();
    scheduler.start().await.unwrap();

    assert_eq!(scheduler.next_run_time(etl.id), None);
    clock.set(utc(2026, 3, 14, 12, 2, 1));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        scheduler.get_job(etl.id).await.unwrap().run_count(),
        0,
        "an inactive job must not fire"
    );

    let report = scheduler.run_job_now(etl.id).await.unwrap();
    assert_eq!(report.code, RUN_REFUSED);
    assert_eq!(report.message, "Job is inactive");

    // Rescheduling brings the trigger back.
    scheduler
        .set_job_status(etl.id, JobStatus::Scheduled)
        .await
        .unwrap();
    assert_eq!(
        scheduler.next_run_time(etl.id),
        Some(utc(2026, 3, 14, 12, 3, 0))
    );
    clock.set(utc(2026, 3, 14, 12, 3, 1));
    assert!(wait_for_status(&scheduler, etl.id, JobStatus::Complete).await);

    scheduler.stop().await;
}

#[tokio::test]
async fn run_requests_report_each_refusal() {
    let store = MemoryStore::new();
    let clock = FakeClock::new();
    let scheduler = fast_scheduler(&store, &clock);

    let report = scheduler.run_job_now(JobId::new(404)).await.unwrap();
    assert_eq!((report.code, report.message.as_str()), (RUN_REFUSED, "Job not found"));

    let parked = scheduler
        .create_job(job("parked", "true", vec![]))
        .await
        .unwrap();
    scheduler
        .set_job_status(parked.id, JobStatus::Inactive)
        .await
        .unwrap();
    let report = scheduler.run_job_now(parked.id).await.unwrap();
    assert_eq!((report.code, report.message.as_str()), (RUN_REFUSED, "Job is inactive"));

    let gated = scheduler
        .create_job(job("gated", "true", vec![parked.id]))
        .await
        .unwrap();
    let report = scheduler.run_job_now(gated.id).await.unwrap();
    assert_eq!(
        (report.code, report.message.as_str()),
        (RUN_REFUSED, "Dependencies not complete")
    );

    let broken = scheduler
        .create_job(job("broken", "exit 1", vec![]))
        .await
        .unwrap();
    let report = scheduler.run_job_now(broken.id).await.unwrap();
    assert_eq!((report.code, report.message.as_str()), (RUN_REFUSED, "Job failed"));

    let healthy = scheduler
        .create_job(job("healthy", "true", vec![]))
        .await
        .unwrap();
    let report = scheduler.run_job_now(healthy.id).await.unwrap();
    assert_eq!((report.code, report.message.as_str()), (0, "Job executed"));
}
