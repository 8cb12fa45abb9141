//! Statistics service - shared engine, ticked eviction, clean shutdown
//!
//! Wraps the engine behind a single exclusive lock and runs a background
//! ticker that evicts expired observations independent of traffic, so an
//! observation silently aging out under an idle stream still disappears
//! from reads within one tick.

use crate::engine::StatsEngine;
use crate::observation::RejectReason;
use crate::snapshot::StatsReader;
use crate::window::Statistics;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

pub struct StatsService {
    engine: Arc<Mutex<StatsEngine>>,
    reader: StatsReader,
    shutdown_tx: watch::Sender<bool>,
    evictor: Option<JoinHandle<()>>,
}

impl StatsService {
    /// Start the service and its background eviction ticker
    pub fn start(engine: StatsEngine, evict_interval_ms: u64) -> Self {
        let reader = engine.reader();
        let engine = Arc::new(Mutex::new(engine));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let evictor = tokio::spawn(eviction_task(
            engine.clone(),
            shutdown_rx,
            evict_interval_ms,
        ));
        Self {
            engine,
            reader,
            shutdown_tx,
            evictor: Some(evictor),
        }
    }

    /// Submit one observation; rejected observations mutate nothing
    pub fn submit(&self, amount: f64, timestamp: i64) -> Result<(), RejectReason> {
        self.engine.lock().unwrap().submit(amount, timestamp)
    }

    /// Evict to the moment of the call, then read
    ///
    /// The result is never staler than "now"; the background tick only
    /// bounds staleness for readers that skip this path.
    pub fn current_statistics(&self) -> Statistics {
        self.engine.lock().unwrap().current_statistics()
    }

    /// Handle for concurrent readers
    ///
    /// Reads take a short lock on the published snapshot, never the
    /// engine lock, so they do not contend with ingestion.
    pub fn statistics_reader(&self) -> StatsReader {
        self.reader.clone()
    }

    /// Drop all observations
    pub fn clear(&self) {
        self.engine.lock().unwrap().clear();
    }

    /// Stop the eviction ticker
    ///
    /// Waits for an in-flight eviction pass to finish before returning,
    /// so the store is never abandoned mid-mutation.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(evictor) = self.evictor.take() {
            if let Err(e) = evictor.await {
                log::warn!("eviction ticker join failed: {}", e);
            }
        }
    }
}

async fn eviction_task(
    engine: Arc<Mutex<StatsEngine>>,
    mut shutdown_rx: watch::Receiver<bool>,
    evict_interval_ms: u64,
) {
    log::info!("⏰ Eviction ticker started (interval: {}ms)", evict_interval_ms);

    let mut timer = interval(Duration::from_millis(evict_interval_ms));

    loop {
        tokio::select! {
            _ = timer.tick() => {
                let mut engine_guard = engine.lock().unwrap();
                engine_guard.evict_now();
            }
            _ = shutdown_rx.changed() => {
                break;
            }
        }
    }

    log::info!("Eviction ticker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DEFAULT_WINDOW_MS;
    use std::sync::atomic::{AtomicI64, Ordering};

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
    async fn test_submit_and_read_through_service() {
        let t = 1_000_000;
        let (_clock, engine) = manual_clock_engine(t);
        let service = StatsService::start(engine, 10);

        service.submit(10.0, t).unwrap();
        service.submit(20.0, t).unwrap();

        let stats = service.current_statistics();
        assert_eq!(stats.sum, 30.0);
        assert_eq!(stats.count, 2);

        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_ticker_expires_idle_window() {
        // Test: expiry becomes visible to a passive reader without any
        // submit or read driving eviction.
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
    async fn test_shutdown_completes() {
        let (_clock, engine) = manual_clock_engine(1_000_000);
        let service = StatsService::start(engine, 5);

        tokio::time::timeout(Duration::from_secs(1), service.shutdown())
            .await
            .expect("shutdown should not hang");
    }
}
