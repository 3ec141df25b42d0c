mod config;

pub use config::{ConfigError, DaemonConfig, OriginConfig, WatchConfig};
