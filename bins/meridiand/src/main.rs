mod source;

use anyhow::Context;
use meridian_config::DaemonConfig;
use meridian_fix::{Fix, unix_time_secs};
use meridian_shm::Publisher;
use source::{CircuitSource, FixSource};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Command line: `meridiand [--destroy] [CONFIG]`.
#[derive(Debug, PartialEq, Eq)]
struct Args {
    /// Remove the segment and exit instead of publishing.
    destroy: bool,
    config: Option<String>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Args {
    let mut args = args.into_iter().peekable();
    let destroy = args.next_if(|a| a == "--destroy").is_some();
    Args {
        destroy,
        config: args.next(),
    }
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1));
    let config = match &args.config {
        Some(path) => DaemonConfig::load(path).with_context(|| format!("loading {path}"))?,
        None => DaemonConfig::default(),
    };
    init_tracing(&config.log_level);

    let key = config.segment_key()?;
    if args.destroy {
        Publisher::<Fix>::destroy(&key).with_context(|| format!("destroying segment {key}"))?;
        return Ok(());
    }

    let mut publisher =
        Publisher::<Fix>::create(&key).with_context(|| format!("creating segment {key}"))?;
    let mut source = CircuitSource::new(config.origin.clone());

    let interval = Duration::from_millis(config.publish_interval_ms);
    let stats_every = Duration::from_secs(config.stats_interval_secs.max(1));
    info!(
        key = %key,
        interval_ms = config.publish_interval_ms,
        "MERIDIAND: exporting fixes"
    );

    let mut last = Instant::now();
    let mut count: u64 = 0;

    loop {
        if let Some(fix) = source.next_fix(unix_time_secs()) {
            let generation = publisher.publish(fix);
            count += 1;
            debug!(
                generation,
                lat = fix.latitude,
                lon = fix.longitude,
                "published fix"
            );
        }

        if last.elapsed() >= stats_every {
            info!(
                published = count,
                generation = publisher.generation(),
                "MERIDIAND: publish rate ~ {:.1} fixes/s",
                count as f64 / last.elapsed().as_secs_f64()
            );
            count = 0;
            last = Instant::now();
        }

        if interval.is_zero() {
            std::hint::spin_loop();
        } else {
            std::thread::sleep(interval);
        }
    }
}
