use anyhow::{Context, bail};
use meridian_config::WatchConfig;
use meridian_fix::Fix;
use meridian_shm::{Reader, RetryPolicy, SegmentKey, ShmError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Attaches to `key`, waiting up to `timeout` for the daemon to create it.
fn open_with_deadline(key: &SegmentKey, timeout: Duration) -> anyhow::Result<Reader<Fix>> {
    let deadline = Instant::now() + timeout;
    loop {
        match Reader::<Fix>::open(key) {
            Ok(reader) => return Ok(reader),
            Err(e @ ShmError::SegmentAbsent { .. }) => {
                if Instant::now() >= deadline {
                    return Err(e).context("giving up waiting for the daemon");
                }
                debug!(key = %key, "segment absent, retrying");
                std::thread::sleep(Duration::from_millis(100));
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn log_fix(generation: u64, fix: &Fix) {
    if fix.has_position() {
        info!(
            generation,
            time = fix.time,
            mode = ?fix.fix_mode(),
            lat = fix.latitude,
            lon = fix.longitude,
            alt = fix.altitude,
            eph = fix.eph,
            track = fix.track,
            speed = fix.speed,
            "fix"
        );
    } else {
        info!(generation, mode = ?fix.fix_mode(), "no fix");
    }
}

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => WatchConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => WatchConfig::default(),
    };
    init_tracing(&config.log_level);

    let key = config.segment_key()?;
    let reader = open_with_deadline(&key, Duration::from_millis(config.open_timeout_ms))?;
    let policy = RetryPolicy::new(
        config.max_attempts,
        Duration::from_micros(config.backoff_us),
    );
    let poll = Duration::from_millis(config.poll_interval_ms);
    info!(key = %key, "MERIDIAN-WATCH: attached");

    let mut last_generation = None;
    loop {
        let generation = reader.generation()?;
        if last_generation != Some(generation) {
            match reader.read_with_retry(&policy) {
                Ok(sample) => {
                    log_fix(sample.generation, &sample.value);
                    last_generation = Some(sample.generation);
                }
                Err(ShmError::Exhausted { attempts }) => {
                    warn!(attempts, "no settled snapshot this poll");
                }
                Err(e) => bail!(e),
            }
        }
        std::thread::sleep(poll);
    }
}
