//! Published statistics snapshot shared between the engine and readers
//!
//! The engine replaces the snapshot wholesale after every mutation, so a
//! reader always observes a consistent aggregate from some completed
//! mutation - never a torn one - without touching the engine lock.

use crate::window::Statistics;
use std::sync::{Arc, RwLock};

/// Writer half held by the engine
#[derive(Clone)]
pub struct SnapshotPublisher {
    shared: Arc<RwLock<Statistics>>,
}

impl SnapshotPublisher {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(RwLock::new(Statistics::empty())),
        }
    }

    /// Replace the published aggregate
    pub fn publish(&self, statistics: Statistics) {
        *self.shared.write().unwrap() = statistics;
    }

    /// Handle for concurrent readers
    pub fn reader(&self) -> StatsReader {
        StatsReader {
            shared: self.shared.clone(),
        }
    }
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only handle onto the last published aggregate
///
/// Reads are a short lock plus a copy of a small struct; staleness is
/// bounded by the eviction tick interval.
#[derive(Clone)]
pub struct StatsReader {
    shared: Arc<RwLock<Statistics>>,
}

impl StatsReader {
    pub fn current(&self) -> Statistics {
        *self.shared.read().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_starts_empty() {
        let publisher = SnapshotPublisher::new();
        assert_eq!(publisher.reader().current(), Statistics::empty());
    }

    #[test]
    fn test_publish_replaces_wholesale() {
        let publisher = SnapshotPublisher::new();
        let reader = publisher.reader();

        let stats = Statistics {
            sum: 30.0,
            avg: 15.0,
            max: 20.0,
            min: 10.0,
            count: 2,
        };
        publisher.publish(stats);
        assert_eq!(reader.current(), stats);

        publisher.publish(Statistics::empty());
        assert_eq!(reader.current(), Statistics::empty());
    }

    #[test]
    fn test_cloned_readers_see_same_snapshot() {
        let publisher = SnapshotPublisher::new();
        let first = publisher.reader();
        let second = first.clone();

        let stats = Statistics {
            sum: 5.0,
            avg: 5.0,
            max: 5.0,
            min: 5.0,
            count: 1,
        };
        publisher.publish(stats);
        assert_eq!(first.current(), stats);
        assert_eq!(second.current(), stats);
    }
}
