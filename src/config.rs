//! Runtime configuration from environment variables

use std::env;

/// Configuration for the statflow runtime
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Trailing window length in milliseconds
    pub window_ms: i64,

    /// Background eviction tick interval in milliseconds
    pub evict_interval_ms: u64,

    /// Optional JSONL observation stream to tail (stdin when unset)
    pub stream_path: Option<String>,

    /// How often to emit the current statistics, in milliseconds
    pub emit_interval_ms: u64,

    /// Optional JSONL file receiving emitted snapshots (log-only when unset)
    pub output_path: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `STATFLOW_WINDOW_MS` (default: 60000)
    /// - `STATFLOW_EVICT_INTERVAL_MS` (default: 100)
    /// - `STATFLOW_STREAM_PATH` (default: unset, read stdin)
    /// - `STATS_EMIT_INTERVAL_MS` (default: 5000)
    /// - `STATS_OUTPUT_PATH` (default: unset, log only)
    pub fn from_env() -> Self {
        Self {
            window_ms: env::var("STATFLOW_WINDOW_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60_000),

            evict_interval_ms: env::var("STATFLOW_EVICT_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),

            stream_path: env::var("STATFLOW_STREAM_PATH").ok(),

            emit_interval_ms: env::var("STATS_EMIT_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5_000),

            output_path: env::var("STATS_OUTPUT_PATH").ok(),
        }
    }
}
