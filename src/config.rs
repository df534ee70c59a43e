//! Configuration Module
//!
//! Handles loading and managing host configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{EvictionStrategy, PolicyConfig, MAX_KEY_LENGTH};

/// Host configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Maximum number of entries per session cache, 0 for unbounded
    pub max_entries: usize,
    /// Default TTL in seconds for entries without explicit TTL, 0 for none
    pub default_ttl: u64,
    /// Which removal mechanisms are active
    pub strategy: EvictionStrategy,
    /// Sweep task interval in seconds
    pub sweep_interval: u64,
    /// Maximum key length in bytes
    pub max_key_length: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `HIPPOCACHE_MAX_ENTRIES` - Maximum entries per cache (default: 1000)
    /// - `HIPPOCACHE_DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `HIPPOCACHE_STRATEGY` - `none`, `lru`, `ttl` or `both` (default: both)
    /// - `HIPPOCACHE_SWEEP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `HIPPOCACHE_MAX_KEY_LENGTH` - Key length limit in bytes (default: 1024)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_or("HIPPOCACHE_MAX_ENTRIES", defaults.max_entries),
            default_ttl: env_or("HIPPOCACHE_DEFAULT_TTL", defaults.default_ttl),
            strategy: env_or("HIPPOCACHE_STRATEGY", defaults.strategy),
            sweep_interval: env_or("HIPPOCACHE_SWEEP_INTERVAL", defaults.sweep_interval),
            max_key_length: env_or("HIPPOCACHE_MAX_KEY_LENGTH", defaults.max_key_length),
        }
    }

    /// Engine policy described by this configuration.
    pub fn policy(&self) -> PolicyConfig {
        PolicyConfig {
            max_entries: (self.max_entries > 0).then_some(self.max_entries),
            default_ttl: (self.default_ttl > 0).then(|| Duration::from_secs(self.default_ttl)),
            strategy: self.strategy,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval.max(1))
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl: 300,
            strategy: EvictionStrategy::Both,
            sweep_interval: 60,
            max_key_length: MAX_KEY_LENGTH,
        }
    }
}
