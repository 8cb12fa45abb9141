//! Statistics engine - validation, window maintenance, snapshot publishing
//!
//! Couples the window store with a clock and the snapshot publisher.
//! Every mutation ends by publishing a fresh aggregate, so readers on the
//! published snapshot never observe intermediate state.

use crate::observation::{self, RejectReason};
use crate::snapshot::{SnapshotPublisher, StatsReader};
use crate::window::{Statistics, WindowStore};

/// Default trailing window: one minute
pub const DEFAULT_WINDOW_MS: i64 = 60_000;

pub struct StatsEngine {
    store: WindowStore,
    window_ms: i64,
    publisher: SnapshotPublisher,
    /// Millisecond clock (for testing with synthetic time)
    now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl StatsEngine {
    /// Engine on the system clock
    pub fn new(window_ms: i64) -> Self {
        Self::new_with_timestamp_fn(
            window_ms,
            Box::new(|| chrono::Utc::now().timestamp_millis()),
        )
    }

    /// Engine with a custom millisecond clock
    ///
    /// Used for testing with deterministic time.
    pub fn new_with_timestamp_fn(
        window_ms: i64,
        now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
    ) -> Self {
        Self {
            store: WindowStore::new(window_ms),
            window_ms,
            publisher: SnapshotPublisher::new(),
            now_fn,
        }
    }

    /// Validate and ingest one observation
    ///
    /// On admission the observation is inserted, expired entries are
    /// evicted opportunistically, and the published snapshot is
    /// refreshed. A rejection mutates nothing.
    pub fn submit(&mut self, amount: f64, timestamp: i64) -> Result<(), RejectReason> {
        let now = (self.now_fn)();
        let observation = observation::validate(amount, timestamp, now, self.window_ms)?;
        self.store.insert(observation);
        self.store.evict_expired(now);
        self.publisher.publish(self.store.snapshot());
        Ok(())
    }

    /// Evict to `now`, publish, and return the current aggregate
    ///
    /// Never fails; reports the all-zero sentinel when nothing is live.
    pub fn current_statistics(&mut self) -> Statistics {
        let now = (self.now_fn)();
        self.store.evict_expired(now);
        let statistics = self.store.snapshot();
        self.publisher.publish(statistics);
        statistics
    }

    /// Eviction pass for the ticked driver
    ///
    /// Publishes after evicting so an idle window's expiry becomes
    /// visible to readers without any traffic.
    pub fn evict_now(&mut self) {
        let now = (self.now_fn)();
        self.store.evict_expired(now);
        self.publisher.publish(self.store.snapshot());
    }

    /// Drop all observations
    ///
    /// Swaps in a freshly constructed store and publishes the empty
    /// aggregate in one step, so no reader mixes pre- and post-clear
    /// observations.
    pub fn clear(&mut self) {
        self.store = WindowStore::new(self.window_ms);
        self.publisher.publish(Statistics::empty());
        log::info!("statistics cleared");
    }

    /// Handle for concurrent readers of the published snapshot
    pub fn reader(&self) -> StatsReader {
        self.publisher.reader()
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }
}
