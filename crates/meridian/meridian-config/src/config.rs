use meridian_shm::{InvalidKey, SegmentKey};
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct DaemonConfig {
    #[serde(default = "defaults::segment")]
    pub segment: String,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    #[serde(default = "defaults::publish_interval_ms")]
    pub publish_interval_ms: u64,
    #[serde(default = "defaults::stats_interval_secs")]
    pub stats_interval_secs: u64,
    #[serde(default)]
    pub origin: OriginConfig,
}

/// Centre and motion of the simulated receiver.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct OriginConfig {
    #[serde(default = "defaults::latitude")]
    pub latitude: f64,
    #[serde(default = "defaults::longitude")]
    pub longitude: f64,
    #[serde(default = "defaults::altitude")]
    pub altitude: f64,
    #[serde(default = "defaults::radius_m")]
    pub radius_m: f64,
    #[serde(default = "defaults::speed_mps")]
    pub speed_mps: f64,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct WatchConfig {
    #[serde(default = "defaults::segment")]
    pub segment: String,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    #[serde(default = "defaults::poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "defaults::backoff_us")]
    pub backoff_us: u64,
    #[serde(default = "defaults::open_timeout_ms")]
    pub open_timeout_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("bad segment key")]
    Segment(#[from] InvalidKey),
}

mod defaults {
    use meridian_shm::SegmentKey;

    pub fn segment() -> String {
        SegmentKey::DEFAULT_NAME.into()
    }

    pub fn log_level() -> String {
        "info".into()
    }

    pub fn publish_interval_ms() -> u64 {
        1000
    }

    pub fn stats_interval_secs() -> u64 {
        10
    }

    pub fn latitude() -> f64 {
        37.4220
    }

    pub fn longitude() -> f64 {
        -122.0841
    }

    pub fn altitude() -> f64 {
        32.0
    }

    pub fn radius_m() -> f64 {
        50.0
    }

    pub fn speed_mps() -> f64 {
        1.5
    }

    pub fn poll_interval_ms() -> u64 {
        250
    }

    pub fn max_attempts() -> u32 {
        16
    }

    pub fn backoff_us() -> u64 {
        50
    }

    pub fn open_timeout_ms() -> u64 {
        5000
    }
}

fn read(path: impl AsRef<Path> + ToString) -> Result<String, ConfigError> {
    std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.to_string(),
        source,
    })
}

impl DaemonConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        Self::parse(&read(path)?)
    }

    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        let daemon_config: DaemonConfig = toml::from_str(toml_str)?;
        daemon_config.segment_key()?;
        Ok(daemon_config)
    }

    pub fn segment_key(&self) -> Result<SegmentKey, ConfigError> {
        Ok(self.segment.parse()?)
    }
}

impl WatchConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        Self::parse(&read(path)?)
    }

    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        let watch_config: WatchConfig = toml::from_str(toml_str)?;
        watch_config.segment_key()?;
        Ok(watch_config)
    }

    pub fn segment_key(&self) -> Result<SegmentKey, ConfigError> {
        Ok(self.segment.parse()?)
    }
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            latitude: defaults::latitude(),
            longitude: defaults::longitude(),
            altitude: defaults::altitude(),
            radius_m: defaults::radius_m(),
            speed_mps: defaults::speed_mps(),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            segment: defaults::segment(),
            log_level: defaults::log_level(),
            publish_interval_ms: defaults::publish_interval_ms(),
            stats_interval_secs: defaults::stats_interval_secs(),
            origin: OriginConfig::default(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            segment: defaults::segment(),
            log_level: defaults::log_level(),
            poll_interval_ms: defaults::poll_interval_ms(),
            max_attempts: defaults::max_attempts(),
            backoff_us: defaults::backoff_us(),
            open_timeout_ms: defaults::open_timeout_ms(),
        }
    }
}
