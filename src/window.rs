//! Trailing-window statistics store
//!
//! Maintains sum/avg/max/min/count over all observations inside a sliding
//! time window, updated incrementally on insert and eviction. No full
//! rescan happens on either path: sum and count follow the entry deque,
//! max and min are read off the fronts of two dominance-frontier deques.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::observation::Observation;

/// Aggregate over all live observations
///
/// For an empty window every field is zero (never infinities or NaN).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub sum: f64,
    pub avg: f64,
    pub max: f64,
    pub min: f64,
    pub count: u64,
}

impl Statistics {
    pub fn empty() -> Self {
        Self {
            sum: 0.0,
            avg: 0.0,
            max: 0.0,
            min: 0.0,
            count: 0,
        }
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::empty()
    }
}

/// Entry held by the store's deques
#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    amount: f64,
    timestamp: i64,
}

/// Incremental store for a single trailing time window
///
/// Three deques share one lifecycle:
/// - `entries` holds every live observation ordered by timestamp (ties
///   keep submission order) and drives sum/count eviction from the front.
/// - `maxima`/`minima` hold the dominance frontier for each extreme:
///   timestamps ascending, amounts descending (maxima) or ascending
///   (minima). The front of a frontier is the current extremum; an entry
///   only stays on a frontier while no later-expiring entry is at least
///   as extreme.
///
/// In-order inserts and evictions are amortized O(1). A late-but-live
/// arrival pays a positional insert proportional to how far out of order
/// it lands.
pub struct WindowStore {
    window_ms: i64,
    entries: VecDeque<WindowEntry>,
    maxima: VecDeque<WindowEntry>,
    minima: VecDeque<WindowEntry>,
    sum: f64,
    count: u64,
}

impl WindowStore {
    pub fn new(window_ms: i64) -> Self {
        assert!(window_ms > 0, "window length must be positive");
        Self {
            window_ms,
            entries: VecDeque::new(),
            maxima: VecDeque::new(),
            minima: VecDeque::new(),
            sum: 0.0,
            count: 0,
        }
    }

    /// Insert a validated observation
    ///
    /// Precondition: the caller has already checked non-negativity and
    /// window membership.
    pub fn insert(&mut self, observation: Observation) {
        let entry = WindowEntry {
            amount: observation.amount,
            timestamp: observation.timestamp,
        };

        // Timestamp-ordered insert; the common in-order arrival appends.
        let mut idx = self.entries.len();
        while idx > 0 && self.entries[idx - 1].timestamp > entry.timestamp {
            idx -= 1;
        }
        if idx == self.entries.len() {
            self.entries.push_back(entry);
        } else {
            self.entries.insert(idx, entry);
        }

        self.sum += entry.amount;
        self.count += 1;

        Self::insert_frontier(&mut self.maxima, entry, |new, old| new >= old);
        Self::insert_frontier(&mut self.minima, entry, |new, old| new <= old);
    }

    /// Insert into a dominance frontier.
    ///
    /// `beats(a, b)` is true when amount `a` is at least as extreme as
    /// amount `b`. Frontier invariant: timestamps ascend front to back,
    /// amounts grow strictly less extreme front to back.
    fn insert_frontier(
        frontier: &mut VecDeque<WindowEntry>,
        entry: WindowEntry,
        beats: impl Fn(f64, f64) -> bool,
    ) {
        // Position of the first frontier entry that outlives `entry`.
        let mut idx = frontier.len();
        while idx > 0 && frontier[idx - 1].timestamp > entry.timestamp {
            idx -= 1;
        }

        // A later-expiring entry at least as extreme makes this one
        // irrelevant: it can never become the window extremum.
        if idx < frontier.len() && beats(frontier[idx].amount, entry.amount) {
            return;
        }

        // Earlier-expiring entries no more extreme than this one can
        // never resurface once it is present.
        while idx > 0 && beats(entry.amount, frontier[idx - 1].amount) {
            frontier.remove(idx - 1);
            idx -= 1;
        }

        if idx == frontier.len() {
            frontier.push_back(entry);
        } else {
            frontier.insert(idx, entry);
        }
    }

    /// Remove every entry whose timestamp has fallen out of the window
    /// ending at `now`.
    ///
    /// Idempotent; repeated calls with a non-decreasing `now` are cheap
    /// because all three fronts short-circuit immediately.
    pub fn evict_expired(&mut self, now: i64) {
        let cutoff = now - self.window_ms;

        while let Some(front) = self.entries.front().copied() {
            if front.timestamp > cutoff {
                break;
            }
            self.entries.pop_front();
            self.sum -= front.amount;
            self.count -= 1;
        }
        while self.maxima.front().map_or(false, |e| e.timestamp <= cutoff) {
            self.maxima.pop_front();
        }
        while self.minima.front().map_or(false, |e| e.timestamp <= cutoff) {
            self.minima.pop_front();
        }

        if self.count == 0 {
            // Repeated subtraction can leave residue behind; the empty
            // window is exactly zero.
            self.sum = 0.0;
            assert!(
                self.entries.is_empty(),
                "count reached zero with {} entries still live",
                self.entries.len()
            );
        }
    }

    /// Current aggregate. Does not evict; callers evict first or accept
    /// the bounded staleness of the eviction tick.
    pub fn snapshot(&self) -> Statistics {
        if self.count == 0 {
            return Statistics::empty();
        }
        assert!(
            !self.maxima.is_empty() && !self.minima.is_empty(),
            "extremum frontier empty with {} live entries",
            self.count
        );
        Statistics {
            sum: self.sum,
            avg: self.sum / self.count as f64,
            max: self.maxima[0].amount,
            min: self.minima[0].amount,
            count: self.count,
        }
    }

    /// Drop every entry and zero the aggregate.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.maxima.clear();
        self.minima.clear();
        self.sum = 0.0;
        self.count = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
