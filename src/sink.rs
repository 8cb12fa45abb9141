//! Snapshot emission backends
//!
//! Defines the interface for emitting periodic statistics snapshots and
//! the JSONL and log implementations behind it.

use crate::window::Statistics;
use async_trait::async_trait;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub enum SinkError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Io(err)
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        SinkError::Serialization(err)
    }
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Io(e) => write!(f, "IO error: {}", e),
            SinkError::Serialization(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for SinkError {}

/// One emitted snapshot line
#[derive(Debug, Serialize)]
pub struct SnapshotRecord {
    pub sum: f64,
    pub avg: f64,
    pub max: f64,
    pub min: f64,
    pub count: u64,
    /// Emission time, Unix milliseconds
    pub timestamp: i64,
}

impl SnapshotRecord {
    pub fn new(statistics: Statistics, timestamp: i64) -> Self {
        Self {
            sum: statistics.sum,
            avg: statistics.avg,
            max: statistics.max,
            min: statistics.min,
            count: statistics.count,
            timestamp,
        }
    }
}

/// Backend trait for emitting statistics snapshots
#[async_trait]
pub trait SnapshotSink: Send {
    /// Emit a single snapshot record
    async fn emit(&mut self, record: &SnapshotRecord) -> Result<(), SinkError>;

    /// Flush pending emissions
    async fn flush(&mut self) -> Result<(), SinkError>;

    /// Get sink type for logging
    fn sink_type(&self) -> &'static str;
}

/// Appends snapshot records to a JSONL file, buffered with periodic flush
pub struct JsonlSnapshotSink {
    writer: BufWriter<std::fs::File>,
    last_flush: Instant,
}

impl JsonlSnapshotSink {
    pub fn new(path: PathBuf) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        log::info!("📝 Writing statistics snapshots to: {}", path.display());
        Ok(Self {
            writer: BufWriter::new(file),
            last_flush: Instant::now(),
        })
    }

    fn write_record(&mut self, record: &SnapshotRecord) -> Result<(), SinkError> {
        let json = serde_json::to_string(record)?;
        writeln!(self.writer, "{}", json)?;

        // Flush every 5 seconds
        if self.last_flush.elapsed() > Duration::from_secs(5) {
            self.writer.flush()?;
            self.last_flush = Instant::now();
        }

        Ok(())
    }
}

impl Drop for JsonlSnapshotSink {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

#[async_trait]
impl SnapshotSink for JsonlSnapshotSink {
    async fn emit(&mut self, record: &SnapshotRecord) -> Result<(), SinkError> {
        self.write_record(record)
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "JSONL"
    }
}

/// Emits snapshots through the logger; the default when no output path
/// is configured
pub struct LogSnapshotSink;

impl LogSnapshotSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogSnapshotSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotSink for LogSnapshotSink {
    async fn emit(&mut self, record: &SnapshotRecord) -> Result<(), SinkError> {
        log::info!(
            "📊 statistics: count={} sum={:.2} avg={:.4} max={:.2} min={:.2}",
            record.count,
            record.sum,
            record.avg,
            record.max,
            record.min
        );
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "log"
    }
}
