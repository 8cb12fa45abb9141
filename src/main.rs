pub mod config;
pub mod engine;
pub mod observation;
pub mod service;
pub mod sink;
pub mod snapshot;
pub mod stream;
pub mod window;

pub use config::Config;
pub use engine::{StatsEngine, DEFAULT_WINDOW_MS};
pub use observation::{Observation, RejectReason};
pub use service::StatsService;
pub use snapshot::StatsReader;
pub use window::{Statistics, WindowStore};

use {
    crate::sink::{JsonlSnapshotSink, LogSnapshotSink, SnapshotRecord, SnapshotSink},
    crate::stream::TailReader,
    std::path::PathBuf,
    tokio::io::{AsyncBufReadExt, BufReader},
    tokio::sync::mpsc,
    tokio::time::{interval, Duration},
};

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Write logs to stderr so emitted snapshots on stdout stay clean
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = Config::from_env();

    log::info!("🚀 Starting statflow...");
    log::info!("📊 Configuration:");
    log::info!("   Window: {}ms", config.window_ms);
    log::info!("   Eviction tick: {}ms", config.evict_interval_ms);
    match &config.stream_path {
        Some(path) => log::info!("   Stream: {}", path),
        None => log::info!("   Stream: stdin"),
    }
    log::info!("   Emit interval: {}ms", config.emit_interval_ms);

    let engine = StatsEngine::new(config.window_ms);
    let service = StatsService::start(engine, config.evict_interval_ms);

    let mut sink: Box<dyn SnapshotSink> = match &config.output_path {
        Some(path) => Box::new(JsonlSnapshotSink::new(PathBuf::from(path))?),
        None => Box::new(LogSnapshotSink::new()),
    };
    log::info!("📝 Snapshot sink: {}", sink.sink_type());

    // Feed observation lines through a bounded channel so the source
    // (tailed file or stdin) applies backpressure instead of buffering
    let (line_tx, mut line_rx) = mpsc::channel::<String>(1_024);

    match &config.stream_path {
        Some(path) => {
            let path = PathBuf::from(path);
            tokio::spawn(async move {
                let mut reader = TailReader::new(path);
                if let Err(e) = reader.start().await {
                    log::error!("❌ Failed to open observation stream: {}", e);
                    return;
                }
                loop {
                    match reader.read_line().await {
                        Ok(Some(line)) => {
                            if line_tx.send(line).await.is_err() {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            log::error!("Observation stream error: {}", e);
                            tokio::time::sleep(Duration::from_secs(5)).await;
                        }
                    }
                }
            });
        }
        None => {
            tokio::spawn(async move {
                let mut lines = BufReader::new(tokio::io::stdin()).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if line_tx.send(line).await.is_err() {
                        break;
                    }
                }
                log::info!("stdin closed");
            });
        }
    }

    let mut emit_ticker = interval(Duration::from_millis(config.emit_interval_ms));
    emit_ticker.tick().await; // Skip first immediate tick

    log::info!("✅ statflow running - accepting observations...");

    let mut submitted = 0u64;
    let mut rejected = 0u64;

    loop {
        tokio::select! {
            maybe_line = line_rx.recv() => {
                match maybe_line {
                    Some(line) => {
                        match Observation::from_jsonl(&line) {
                            Ok(observation) => {
                                match service.submit(observation.amount, observation.timestamp) {
                                    Ok(()) => submitted += 1,
                                    Err(reason) => {
                                        rejected += 1;
                                        log::debug!("observation rejected ({}): {}", reason, line);
                                    }
                                }
                            }
                            Err(e) => {
                                log::warn!("Failed to parse observation: {} ({})", e, line);
                            }
                        }
                    }
                    None => {
                        log::info!("Observation stream ended");
                        break;
                    }
                }
            }

            _ = emit_ticker.tick() => {
                let statistics = service.current_statistics();
                let record = SnapshotRecord::new(statistics, chrono::Utc::now().timestamp_millis());
                if let Err(e) = sink.emit(&record).await {
                    log::error!("❌ Failed to emit snapshot: {}", e);
                }
                log::info!(
                    "📊 window: count={} sum={:.2} avg={:.4} max={:.2} min={:.2} | submitted={} rejected={}",
                    statistics.count,
                    statistics.sum,
                    statistics.avg,
                    statistics.max,
                    statistics.min,
                    submitted,
                    rejected
                );
            }

            _ = tokio::signal::ctrl_c() => {
                log::info!("ctrl-c received, shutting down");
                break;
            }
        }
    }

    // Final emission so the tail of the run is on record
    let statistics = service.current_statistics();
    let record = SnapshotRecord::new(statistics, chrono::Utc::now().timestamp_millis());
    if let Err(e) = sink.emit(&record).await {
        log::error!("❌ Failed to emit final snapshot: {}", e);
    }
    let _ = sink.flush().await;

    service.shutdown().await;
    log::info!("✅ statflow stopped");
    Ok(())
}
