use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StreamError};

/// Default idle timeout for SSE streams: no data for this long means the stream is dead.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

pub const IDLE_TIMEOUT_ENV: &str = "SSE_IDLE_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStreamConfig")]
pub struct StreamConfig {
    pub idle_timeout_secs: u64,
}

/// Unvalidated shape of `StreamConfig` as it appears on the wire.
#[derive(Deserialize)]
struct RawStreamConfig {
    idle_timeout_secs: u64,
}

impl TryFrom<RawStreamConfig> for StreamConfig {
    type Error = StreamError;

    fn try_from(raw: RawStreamConfig) -> Result<Self> {
        StreamConfig::default().with_idle_timeout_secs(raw.idle_timeout_secs)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
        }
    }
}

impl StreamConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn with_idle_timeout_secs(mut self, secs: u64) -> Result<Self> {
        if secs == 0 {
            return Err(StreamError::Config("idle timeout must be at least 1s".to_string()));
        }
        self.idle_timeout_secs = secs;
        Ok(self)
    }
}

/// Build the stream configuration from the environment.
pub fn load_config() -> Result<StreamConfig> {
    config_from_lookup(|key| std::env::var(key).ok())
}

fn config_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<StreamConfig> {
    let config = StreamConfig::default();

    match lookup(IDLE_TIMEOUT_ENV) {
        None => Ok(config),
        Some(raw) => {
            let secs = raw.trim().parse::<u64>().map_err(|e| {
                StreamError::Config(format!("{}={:?} is not a number of seconds: {}", IDLE_TIMEOUT_ENV, raw, e))
            })?;
            config.with_idle_timeout_secs(secs)
        }
    }
}
