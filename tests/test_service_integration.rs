//! Integration tests for the statistics service
//!
//! Exercises the public service surface end to end: submission, reads
//! through both the locking and the published-snapshot paths, clearing,
//! ticked eviction under an idle stream, and clean shutdown.

use statflow::{RejectReason, Statistics, StatsEngine, StatsService, DEFAULT_WINDOW_MS};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::time::Duration;

/// Engine driven by a manually advanced millisecond clock
fn manual_clock_engine(start: i64) -> (Arc<AtomicI64>, StatsEngine) {
    let clock = Arc::new(AtomicI64::new(start));
    let handle = clock.clone();
    let engine = StatsEngine::new_with_timestamp_fn(
        DEFAULT_WINDOW_MS,
        Box::new(move || handle.load(Ordering::SeqCst)),
    );
    (clock, engine)
}

#[tokio::test]
async fn test_submit_read_clear_cycle() {
    let t = 1_000_000;
    let (_clock, engine) = manual_clock_engine(t);
    let service = StatsService::start(engine, 10);

    service.submit(10.0, t).unwrap();
    service.submit(20.0, t - 10).unwrap();
    service.submit(30.0, t - 20).unwrap();

    let stats = service.current_statistics();
    assert_eq!(stats.sum, 60.0);
    assert_eq!(stats.avg, 20.0);
    assert_eq!(stats.max, 30.0);
    assert_eq!(stats.min, 10.0);
    assert_eq!(stats.count, 3);

    // Clear discards everything; the next submission stands alone
    service.clear();
    assert_eq!(service.current_statistics(), Statistics::empty());

    service.submit(5.0, t).unwrap();
    let stats = service.current_statistics();
    assert_eq!(stats.count, 1);
    assert_eq!(stats.sum, 5.0);
    assert_eq!(stats.max, 5.0);
    assert_eq!(stats.min, 5.0);

    service.shutdown().await;
}

#[tokio::test]
async fn test_rejections_do_not_disturb_readers() {
    let t = 1_000_000;
    let (_clock, engine) = manual_clock_engine(t);
    let service = StatsService::start(engine, 10);
    let reader = service.statistics_reader();

    service.submit(10.0, t).unwrap();
    let before = reader.current();

    assert_eq!(
        service.submit(-1.0, t),
        Err(RejectReason::NegativeAmount)
    );
    assert_eq!(
        service.submit(99.0, t - DEFAULT_WINDOW_MS - 1),
        Err(RejectReason::TimestampOutsideWindow)
    );
    assert_eq!(
        service.submit(99.0, t + 1),
        Err(RejectReason::TimestampOutsideWindow)
    );

    assert_eq!(reader.current(), before);

    service.shutdown().await;
}

#[tokio::test]
async fn test_idle_expiry_reaches_passive_readers() {
    // No submit or read after the clock jump; only the eviction ticker
    // can make the expiry visible.
    let t = 1_000_000;
    let (clock, engine) = manual_clock_engine(t);
    let service = StatsService::start(engine, 5);
    let reader = service.statistics_reader();

    service.submit(42.0, t).unwrap();
    assert_eq!(reader.current().count, 1);

    clock.store(t + DEFAULT_WINDOW_MS + 1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(reader.current(), Statistics::empty());

    service.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_submitters_all_visible() {
    let t = 1_000_000;
    let (_clock, engine) = manual_clock_engine(t);
    let service = Arc::new(StatsService::start(engine, 10));

    let mut handles = Vec::new();
    for worker in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..50i64 {
                service
                    .submit(1.0 + worker as f64, t - (i % 100))
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stats = service.current_statistics();
    assert_eq!(stats.count, 400);
    assert_eq!(stats.max, 8.0);
    assert_eq!(stats.min, 1.0);
}

#[tokio::test]
async fn test_shutdown_waits_for_ticker() {
    let (_clock, engine) = manual_clock_engine(1_000_000);
    let service = StatsService::start(engine, 1);

    // A short busy period so the ticker is mid-cadence when we stop
    tokio::time::sleep(Duration::from_millis(20)).await;

    tokio::time::timeout(Duration::from_secs(1), service.shutdown())
        .await
        .expect("shutdown should finish promptly");
}
