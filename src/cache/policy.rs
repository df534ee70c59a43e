//! Eviction Policy Module
//!
//! Decides which entries may be purged. The policy holds no per-entry state:
//! it is handed the table's entries in recency order and returns victim keys.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheEntry, Timestamp};
use crate::error::{CacheError, Result};

// == Strategy ==
/// Which automatic removal rules are active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionStrategy {
    /// Nothing is removed automatically; the table grows unbounded
    None,
    /// Capacity pressure evicts least recently used entries
    Lru,
    /// Idle entries past their TTL expire
    Ttl,
    /// Both LRU eviction and TTL expiry
    #[default]
    Both,
}

impl EvictionStrategy {
    pub fn evicts_lru(self) -> bool {
        matches!(self, EvictionStrategy::Lru | EvictionStrategy::Both)
    }

    pub fn expires_ttl(self) -> bool {
        matches!(self, EvictionStrategy::Ttl | EvictionStrategy::Both)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EvictionStrategy::None => "none",
            EvictionStrategy::Lru => "lru",
            EvictionStrategy::Ttl => "ttl",
            EvictionStrategy::Both => "both",
        }
    }
}

impl fmt::Display for EvictionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvictionStrategy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(EvictionStrategy::None),
            "lru" => Ok(EvictionStrategy::Lru),
            "ttl" => Ok(EvictionStrategy::Ttl),
            "both" => Ok(EvictionStrategy::Both),
            other => Err(CacheError::InvalidConfig(format!(
                "Unknown eviction strategy '{}'",
                other
            ))),
        }
    }
}

// == Policy Configuration ==
/// Eviction settings, fixed for the lifetime of an engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Entry cap enforced under LRU strategies, None = unbounded
    pub max_entries: Option<usize>,
    /// TTL applied to new entries that do not bring their own
    pub default_ttl: Option<Duration>,
    pub strategy: EvictionStrategy,
}

impl PolicyConfig {
    /// LRU-only configuration with the given entry cap.
    pub fn lru(max_entries: usize) -> Self {
        Self {
            max_entries: Some(max_entries),
            default_ttl: None,
            strategy: EvictionStrategy::Lru,
        }
    }

    /// TTL-only configuration with the given default TTL.
    pub fn ttl(default_ttl: Duration) -> Self {
        Self {
            max_entries: None,
            default_ttl: Some(default_ttl),
            strategy: EvictionStrategy::Ttl,
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    pub fn with_strategy(mut self, strategy: EvictionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    // == Validate ==
    /// Rejects settings that would make every insert self-destruct.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == Some(0) {
            return Err(CacheError::InvalidConfig(
                "max_entries must be greater than zero".to_string(),
            ));
        }
        if self.default_ttl == Some(Duration::ZERO) {
            return Err(CacheError::InvalidConfig(
                "default_ttl must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// == Victim Scope ==
/// Which class of candidates a selection pass considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VictimScope {
    /// TTL-expired entries only (periodic sweep)
    Expired,
    /// LRU overflow only (capacity pressure after a put)
    Overflow,
    /// Both classes
    All,
}

impl VictimScope {
    fn includes_expired(self) -> bool {
        matches!(self, VictimScope::Expired | VictimScope::All)
    }

    fn includes_overflow(self) -> bool {
        matches!(self, VictimScope::Overflow | VictimScope::All)
    }
}

// == Eviction Policy ==
/// Stateless victim selection for one engine.
#[derive(Debug, Clone)]
pub struct EvictionPolicy {
    config: PolicyConfig,
}

impl EvictionPolicy {
    /// Builds a policy from a validated configuration.
    pub fn new(config: PolicyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn strategy(&self) -> EvictionStrategy {
        self.config.strategy
    }

    /// TTL given to entries written without one, None unless the strategy
    /// expires by TTL.
    pub fn default_ttl(&self) -> Option<Duration> {
        self.config.default_ttl.filter(|_| self.config.strategy.expires_ttl())
    }

    /// Whether sweeps and overflow passes treat `entry` as expired at `now`.
    ///
    /// Reads check the entry's own TTL regardless of strategy.
    pub fn is_expired(&self, entry: &CacheEntry, now: Timestamp) -> bool {
        self.config.strategy.expires_ttl() && entry.is_expired(now)
    }

    /// Number of entries above the cap, zero when LRU is inactive.
    pub fn overflow(&self, len: usize) -> usize {
        match self.config.max_entries {
            Some(max) if self.config.strategy.evicts_lru() => len.saturating_sub(max),
            _ => 0,
        }
    }

    // == Select Victims ==
    /// Picks the keys to remove.
    ///
    /// `candidates` must be ordered least recently used first; overflow
    /// victims are taken from the front of that order. Pinned entries are
    /// never selected. `len` is the current table size.
    ///
    /// A scope that includes overflow stops walking as soon as the overflow
    /// is covered, so a put under pressure visits only the entries it removes
    /// plus any pinned ones in between. Expired entries met on that walk are
    /// taken and count towards the overflow. Only `VictimScope::Expired` walks
    /// every candidate.
    pub fn select_victims<'a, I>(
        &self,
        candidates: I,
        len: usize,
        now: Timestamp,
        scope: VictimScope,
    ) -> Vec<String>
    where
        I: IntoIterator<Item = (&'a str, &'a CacheEntry)>,
    {
        let check_ttl = scope.includes_expired() && self.config.strategy.expires_ttl();
        let bounded = scope.includes_overflow();
        let mut overflow = if bounded { self.overflow(len) } else { 0 };

        let mut victims = Vec::new();
        if !check_ttl && overflow == 0 {
            return victims;
        }

        for (key, entry) in candidates {
            if bounded && overflow == 0 {
                break;
            }
            if entry.pinned {
                continue;
            }

            if check_ttl && entry.is_expired(now) {
                victims.push(key.to_string());
                overflow = overflow.saturating_sub(1);
            } else if overflow > 0 {
                victims.push(key.to_string());
                overflow -= 1;
            }
        }

        victims
    }
}
