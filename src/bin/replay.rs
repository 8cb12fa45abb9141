//! Replay / load-generation tool
//!
//! Replays a recorded JSONL observation stream re-based onto the current
//! clock, or generates a synthetic random observation stream when no file
//! is configured. Useful for soak-testing the engine and for producing
//! realistic snapshot output without a live producer.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin replay
//! ```
//!
//! ## Environment Variables
//!
//! - REPLAY_STREAM_PATH - JSONL observation file to replay (unset: synthetic stream)
//! - REPLAY_RATE_PER_SEC - Synthetic observations per second (default: 10)
//! - REPLAY_MAX_AMOUNT - Upper bound for synthetic amounts (default: 1000.0)
//! - REPLAY_DURATION_SECS - Stop the synthetic stream after this long (default: run until ctrl-c)
//! - STATFLOW_WINDOW_MS - Trailing window length in milliseconds (default: 60000)
//! - STATS_EMIT_INTERVAL_MS - How often to log statistics (default: 5000)
//! - RUST_LOG - Logging level (optional, default: info)

use rand::Rng;
use statflow::{Observation, StatsEngine, StatsService};
use std::env;
use std::path::PathBuf;
use tokio::time::{interval, sleep, Duration, Instant};

#[derive(Debug)]
struct ReplayConfig {
    stream_path: Option<PathBuf>,
    rate_per_sec: u64,
    max_amount: f64,
    duration_secs: Option<u64>,
    window_ms: i64,
    emit_interval_ms: u64,
}

impl ReplayConfig {
    fn from_env() -> Self {
        Self {
            stream_path: env::var("REPLAY_STREAM_PATH").ok().map(PathBuf::from),
            rate_per_sec: env::var("REPLAY_RATE_PER_SEC")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            max_amount: env::var("REPLAY_MAX_AMOUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1_000.0),
            duration_secs: env::var("REPLAY_DURATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok()),
            window_ms: env::var("STATFLOW_WINDOW_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60_000),
            emit_interval_ms: env::var("STATS_EMIT_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5_000),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let config = ReplayConfig::from_env();

    log::info!("🚀 Starting observation replay");
    match &config.stream_path {
        Some(path) => log::info!("   Source: {}", path.display()),
        None => log::info!(
            "   Source: synthetic ({}/s, amounts 0..{})",
            config.rate_per_sec,
            config.max_amount
        ),
    }
    log::info!("   Window: {}ms", config.window_ms);

    let engine = StatsEngine::new(config.window_ms);
    let service = StatsService::start(engine, 100);

    match config.stream_path.clone() {
        Some(path) => replay_file(&service, &path).await?,
        None => generate(&service, &config).await,
    }

    let statistics = service.current_statistics();
    log::info!(
        "✅ Replay finished: count={} sum={:.2} avg={:.4} max={:.2} min={:.2}",
        statistics.count,
        statistics.sum,
        statistics.avg,
        statistics.max,
        statistics.min
    );

    service.shutdown().await;
    Ok(())
}

/// Replay a recorded stream at its original cadence, re-based so the
/// first observation lands at "now"
async fn replay_file(
    service: &StatsService,
    path: &PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = tokio::fs::read_to_string(path).await?;
    let mut observations = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match Observation::from_jsonl(line) {
            Ok(observation) => observations.push(observation),
            Err(e) => log::warn!("skipping malformed observation: {} ({})", e, line),
        }
    }

    if observations.is_empty() {
        log::warn!("⚠️  Nothing to replay in {}", path.display());
        return Ok(());
    }

    let first_ts = observations[0].timestamp;
    let offset = chrono::Utc::now().timestamp_millis() - first_ts;
    log::info!(
        "📖 Replaying {} observations (re-based by {}ms)",
        observations.len(),
        offset
    );

    let started = Instant::now();
    let mut submitted = 0u64;
    let mut rejected = 0u64;

    for observation in observations {
        // Hold each observation back until its re-based moment arrives
        let due_ms = (observation.timestamp - first_ts).max(0) as u64;
        let elapsed = started.elapsed().as_millis() as u64;
        if due_ms > elapsed {
            sleep(Duration::from_millis(due_ms - elapsed)).await;
        }

        match service.submit(observation.amount, observation.timestamp + offset) {
            Ok(()) => submitted += 1,
            Err(reason) => {
                rejected += 1;
                log::debug!("observation rejected ({})", reason);
            }
        }
    }

    log::info!("📊 Replayed: {} submitted, {} rejected", submitted, rejected);
    Ok(())
}

/// Generate a synthetic observation stream until the configured duration
/// elapses or ctrl-c arrives
async fn generate(service: &StatsService, config: &ReplayConfig) {
    let tick_ms = (1_000 / config.rate_per_sec.max(1)).max(1);
    let mut submit_ticker = interval(Duration::from_millis(tick_ms));
    let mut emit_ticker = interval(Duration::from_millis(config.emit_interval_ms));
    emit_ticker.tick().await; // Skip first immediate tick

    let deadline = config
        .duration_secs
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut rng = rand::thread_rng();
    let mut submitted = 0u64;

    loop {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                log::info!("Configured duration elapsed");
                break;
            }
        }

        tokio::select! {
            _ = submit_ticker.tick() => {
                let amount = rng.gen_range(0.0..config.max_amount);
                let timestamp = chrono::Utc::now().timestamp_millis();
                if let Err(reason) = service.submit(amount, timestamp) {
                    log::warn!("⚠️  Synthetic observation rejected: {}", reason);
                } else {
                    submitted += 1;
                }
            }

            _ = emit_ticker.tick() => {
                let statistics = service.current_statistics();
                log::info!(
                    "📊 window: count={} sum={:.2} avg={:.4} max={:.2} min={:.2} | submitted={}",
                    statistics.count,
                    statistics.sum,
                    statistics.avg,
                    statistics.max,
                    statistics.min,
                    submitted
                );
            }

            _ = tokio::signal::ctrl_c() => {
                log::info!("ctrl-c received, stopping generator");
                break;
            }
        }
    }
}
