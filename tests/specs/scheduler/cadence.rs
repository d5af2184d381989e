//! Trigger cadence specs
//!
//! Drives the scheduler with a fake clock and a fast tick loop to pin
//! down when triggers fire and how the next run time moves.

use std::time::Duration;

use rota_core::{CronField, FakeClock, JobStatus, Schedule};
use rota_store::MemoryStore;

use crate::prelude::*;

#[tokio::test]
async fn a_five_minute_job_waits_for_the_next_boundary() {
    let store = MemoryStore::new();
    let clock = FakeClock::at(utc(2026, 3, 14, 12, 2, 10));
    let scheduler = fast_scheduler(&store, &clock);

    let etl = scheduler
        .create_job(job_every(5, "etl", "echo tick", vec![]))
        .await
        .unwrap();
    assert_eq!(
        scheduler.next_run_time(etl.id),
        Some(utc(2026, 3, 14, 12, 5, 0)),
        "12:02 should round up to the 12:05 boundary"
    );

    scheduler.start().await.unwrap();
    clock.set(utc(2026, 3, 14, 12, 5, 1));

    assert!(
        wait_for_status(&scheduler, etl.id, JobStatus::Complete).await,
        "the job should run once the boundary passes"
    );
    let etl = scheduler.get_job(etl.id).await.unwrap();
    assert_eq!(etl.run_count(), 1);
    assert_eq!(
        scheduler.next_run_time(etl.id),
        Some(utc(2026, 3, 14, 12, 10, 0)),
        "firing should advance the trigger to the following boundary"
    );

    scheduler.stop().await;
}

#[tokio::test]
async fn the_next_run_is_computed_on_registration() {
    let store = MemoryStore::new();
    let clock = FakeClock::at(utc(2026, 3, 14, 12, 0, 0));
    let scheduler = fast_scheduler(&store, &clock);

    let quarterly = scheduler
        .create_job(job_every(15, "quarterly", "true", vec![]))
        .await
        .unwrap();
    let minutely = scheduler
        .create_job(job("minutely", "true", vec![]))
        .await
        .unwrap();

    assert_eq!(
        scheduler.next_run_time(quarterly.id),
        Some(utc(2026, 3, 14, 12, 15, 0))
    );
    assert_eq!(
        scheduler.next_run_time(minutely.id),
        Some(utc(2026, 3, 14, 12, 1, 0)),
        "a job created exactly on a boundary fires on the next one, not now"
    );
}

#[tokio::test]
async fn deleting_a_job_clears_its_next_run() {
    let store = MemoryStore::new();
    let clock = FakeClock::new();
    let scheduler = fast_scheduler(&store, &clock);

    let etl = scheduler
        .create_job(job("etl", "true", vec![]))
        .await
        .unwrap();
    assert!(scheduler.next_run_time(etl.id).is_some());

    scheduler.delete_job(etl.id).await.unwrap();
    assert_eq!(
        scheduler.next_run_time(etl.id),
        None,
        "a deleted job should have no upcoming run"
    );
}

#[tokio::test]
async fn completion_parks_the_trigger_until_rearmed() {
    let store = MemoryStore::new();
    let clock = FakeClock::at(utc(2026, 3, 14, 12, 0, 0));
    let scheduler = fast_scheduler(&store, &clock);

    let etl = scheduler
        .create_job(job("etl", "echo tick", vec![]))
        .await
        .unwrap();
    scheduler.start().await.unwrap();

    clock.set(utc(2026, 3, 14, 12, 1, 1));
    assert!(wait_for_status(&scheduler, etl.id, JobStatus::Complete).await);
    assert_eq!(scheduler.get_job(etl.id).await.unwrap().run_count(), 1);

    // The next boundary passes while the job is still complete.
    clock.set(utc(2026, 3, 14, 12, 2, 1));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        scheduler.get_job(etl.id).await.unwrap().run_count(),
        1,
        "a complete job should not re-run on schedule"
    );

    // Re-arming makes the following boundary count again.
    scheduler
        .set_job_status(etl.id, JobStatus::Scheduled)
        .await
        .unwrap();
    clock.set(utc(2026, 3, 14, 12, 3, 1));
    assert!(wait_for_status(&scheduler, etl.id, JobStatus::Complete).await);
    assert_eq!(scheduler.get_job(etl.id).await.unwrap().run_count(), 2);

    scheduler.stop().await;
}

#[tokio::test]
async fn calling_start_twice_keeps_a_single_cadence() {
    let store = MemoryStore::new();
    let clock = FakeClock::at(utc(2026, 3, 14, 12, 0, 0));
    let scheduler = fast_scheduler(&store, &clock);

    let etl = scheduler
        .create_job(job("etl", "echo tick", vec![]))
        .await
        .unwrap();
    scheduler.start().await.unwrap();
    scheduler.start().await.unwrap();

    clock.set(utc(2026, 3, 14, 12, 1, 1));
    assert!(wait_for_status(&scheduler, etl.id, JobStatus::Complete).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        scheduler.get_job(etl.id).await.unwrap().run_count(),
        1,
        "a restarted loop must not fire the same trigger twice"
    );

    scheduler.stop().await;
}

#[tokio::test]
async fn rescheduling_moves_the_next_run() {
    let store = MemoryStore::new();
    let clock = FakeClock::at(utc(2026, 3, 14, 12, 0, 0));
    let scheduler = fast_scheduler(&store, &clock);

    let mut etl = scheduler
        .create_job(job_every(5, "etl", "true", vec![]))
        .await
        .unwrap();
    assert_eq!(
        scheduler.next_run_time(etl.id),
        Some(utc(2026, 3, 14, 12, 5, 0))
    );

    etl.schedule = Schedule {
        minute: CronField::Step(30),
        ..Schedule::default()
    };
    scheduler.update_job(&etl).await.unwrap();
    assert_eq!(
        scheduler.next_run_time(etl.id),
        Some(utc(2026, 3, 14, 12, 30, 0)),
        "an updated schedule should take effect immediately"
    );
}
