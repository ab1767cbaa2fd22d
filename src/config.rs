//! Runtime configuration.
//!
//! Settings come from `$XDG_CONFIG_HOME/lzthumb/config.json` (falling back to
//! `~/.config`), then `LZTHUMB_*` environment variables on top.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::backend::ProfileTable;
use crate::cache::DEFAULT_CAPACITY;
use crate::fetch::DEFAULT_RETRY_DELAY;

const ENV_CACHE_CAPACITY: &str = "LZTHUMB_CACHE_CAPACITY";
const ENV_RETRY_DELAY_MS: &str = "LZTHUMB_RETRY_DELAY_MS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Maximum number of cached records. Should cover the visible rows plus
    /// the prefetch tail plus in-flight fetches to avoid thrashing.
    pub cache_capacity: usize,
    /// Delay before an inconclusive fetch becomes eligible again.
    pub io_retry_delay_ms: u64,
    pub profiles: ProfileTable,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CAPACITY,
            io_retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64,
            profiles: ProfileTable::default(),
        }
    }
}

impl ThumbnailConfig {
    /// Load from the default location with env overrides, falling back to
    /// defaults on any error.
    pub fn load() -> Self {
        let mut config = match config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                warn!(error = %e, "ignoring config file");
                Self::default()
            }),
            _ => Self::default(),
        };
        if let Err(e) = config.apply_env() {
            warn!(error = %e, "ignoring environment override");
        }
        config
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config.normalized())
    }

    /// Apply `LZTHUMB_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup(ENV_CACHE_CAPACITY) {
            self.cache_capacity = parse_value(ENV_CACHE_CAPACITY, &value)?;
        }
        if let Some(value) = lookup(ENV_RETRY_DELAY_MS) {
            self.io_retry_delay_ms = parse_value(ENV_RETRY_DELAY_MS, &value)?;
        }
        *self = std::mem::take(self).normalized();
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.io_retry_delay_ms)
    }

    fn normalized(mut self) -> Self {
        if self.cache_capacity == 0 {
            self.cache_capacity = DEFAULT_CAPACITY;
        }
        self
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
}

pub fn config_file_path() -> Option<PathBuf> {
    let home = env::home_dir()?;
    let base = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| home.join(".config"));
    Some(base.join("lzthumb").join("config.json"))
}
