//! Cache Table Module
//!
//! Hash-indexed entry storage kept in lockstep with the LRU tracker, with the
//! eviction policy applied on writes, reads and sweeps.

use std::any::Any;
use std::collections::HashMap;

use tracing::debug;

use crate::cache::{
    CacheEntry, CacheStats, EvictionPolicy, LruTracker, PutOptions, Timestamp, ValueBox,
    VictimScope, MAX_KEY_LENGTH,
};
use crate::error::{CacheError, Result};

// == Cache Table ==
/// Entry storage with LRU tracking, TTL expiry and pinning.
///
/// Every key in `entries` is tracked by `lru` and vice versa; all mutations
/// go through `insert`/`remove_entry` to keep the two in sync.
#[derive(Debug)]
pub struct CacheTable {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    policy: EvictionPolicy,
    /// Performance statistics
    stats: CacheStats,
    max_key_length: usize,
}

impl CacheTable {
    // == Constructor ==
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            policy,
            stats: CacheStats::new(),
            max_key_length: MAX_KEY_LENGTH,
        }
    }

    /// Overrides the key length limit (bytes).
    pub fn with_max_key_length(mut self, max_key_length: usize) -> Self {
        self.max_key_length = max_key_length;
        self
    }

    // == Key Validation ==
    pub fn validate_key(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey("Key cannot be empty".to_string()));
        }
        if key.len() > self.max_key_length {
            return Err(CacheError::InvalidKey(format!(
                "Key exceeds maximum length of {} bytes",
                self.max_key_length
            )));
        }
        Ok(())
    }

    // == Put ==
    /// Stores a value under `key`.
    ///
    /// An existing live entry is updated in place: value replaced, access time
    /// refreshed, TTL and pin changed only if `opts` says so. An existing entry
    /// that already expired is dropped and replaced by a fresh one.
    ///
    /// Afterwards, under an LRU strategy, least recently used unpinned entries
    /// are evicted until the table is back under its cap. The key just written
    /// is never its own victim, and pinned entries may leave the table above
    /// the cap.
    pub fn put(
        &mut self,
        key: &str,
        value: ValueBox,
        opts: PutOptions,
        now: Timestamp,
    ) -> Result<()> {
        self.validate_key(key)?;
        self.expire_if_stale(key, now);

        let default_ttl = self.policy.default_ttl();
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.value = value;
                entry.touch(now);
                entry.ttl = opts.expiry.resolve(Some(entry.ttl), default_ttl);
                if let Some(pinned) = opts.pin {
                    entry.pinned = pinned;
                }
            }
            None => {
                let ttl = opts.expiry.resolve(None, default_ttl);
                let entry = CacheEntry::new(value, ttl, opts.pin.unwrap_or(false), now);
                self.entries.insert(key.to_string(), entry);
            }
        }
        self.lru.touch(key);

        self.evict_overflow(key, now);
        self.stats.set_total_entries(self.entries.len());
        Ok(())
    }

    // == Get ==
    /// Retrieves a clone of the value stored under `key`.
    ///
    /// A hit refreshes the entry's access time and recency. An expired entry
    /// is removed and reported as a miss.
    pub fn get(&mut self, key: &str, now: Timestamp) -> Option<ValueBox> {
        self.expire_if_stale(key, now);

        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.touch(now);
                let value = entry.value.clone();
                self.lru.touch(key);
                self.stats.record_hit();
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Retrieves the value under `key` as a `T`.
    ///
    /// # Errors
    /// `TypeMismatch` if the entry holds another type. The entry, its access
    /// time and its recency are left untouched in that case.
    pub fn get_as<T: Any + Clone>(&mut self, key: &str, now: Timestamp) -> Result<Option<T>> {
        self.expire_if_stale(key, now);

        let Some(entry) = self.entries.get_mut(key) else {
            self.stats.record_miss();
            return Ok(None);
        };

        let value = entry.value.get_cloned::<T>()?;
        entry.touch(now);
        self.lru.touch(key);
        self.stats.record_hit();
        Ok(Some(value))
    }

    // == Contains ==
    /// Checks whether a live entry exists, without counting as an access.
    pub fn contains(&self, key: &str, now: Timestamp) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Read-only view of an entry's metadata. Does not check expiry.
    pub fn entry(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    // == Remove ==
    /// Removes an entry by key. Returns whether it existed.
    pub fn remove(&mut self, key: &str) -> bool {
        let existed = self.remove_entry(key).is_some();
        self.stats.set_total_entries(self.entries.len());
        existed
    }

    // == Clear ==
    /// Removes every entry, pinned ones included. Returns how many went.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.lru.clear();
        self.stats.set_total_entries(0);
        count
    }

    // == Sweep ==
    /// Removes all TTL-expired entries at `now`.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&mut self, now: Timestamp) -> usize {
        let victims = {
            let entries = &self.entries;
            let candidates = self
                .lru
                .iter_oldest_first()
                .filter_map(|key| entries.get(key).map(|entry| (key, entry)));
            self.policy
                .select_victims(candidates, entries.len(), now, VictimScope::Expired)
        };

        for key in &victims {
            self.remove_entry(key);
            debug!(key = %key, "Expired cache entry removed by sweep");
        }

        self.stats.record_expirations(victims.len());
        self.stats.set_total_entries(self.entries.len());
        victims.len()
    }

    // == Introspection ==
    /// Returns the current number of entries in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry cap enforced by the policy, None when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        let config = self.policy.config();
        config
            .max_entries
            .filter(|_| config.strategy.evicts_lru())
    }

    pub fn policy(&self) -> &EvictionPolicy {
        &self.policy
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Internal Helpers ==
    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(key);
        Some(entry)
    }

    /// Drops `key` if it exists and has expired. Returns whether it did.
    fn expire_if_stale(&mut self, key: &str, now: Timestamp) -> bool {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(now));

        if expired {
            self.remove_entry(key);
            self.stats.record_expirations(1);
            self.stats.set_total_entries(self.entries.len());
            debug!(key = %key, "Expired cache entry removed on access");
        }
        expired
    }

    /// Brings the table back under its cap after a write. Expired entries met
    /// before the overflow is covered go in the same pass and count towards it.
    fn evict_overflow(&mut self, protected: &str, now: Timestamp) {
        if self.policy.overflow(self.entries.len()) == 0 {
            return;
        }

        let victims = {
            let entries = &self.entries;
            let candidates = self
                .lru
                .iter_oldest_first()
                .filter(|key| *key != protected)
                .filter_map(|key| entries.get(key).map(|entry| (key, entry)));
            self.policy
                .select_victims(candidates, entries.len(), now, VictimScope::All)
        };

        let mut evicted = 0;
        let mut expired = 0;
        for key in &victims {
            let Some(entry) = self.remove_entry(key) else {
                continue;
            };
            if self.policy.is_expired(&entry, now) {
                expired += 1;
                debug!(key = %key, "Expired cache entry removed under capacity pressure");
            } else {
                evicted += 1;
                debug!(key = %key, "Evicted least recently used entry");
            }
        }
        self.stats.record_evictions(evicted);
        self.stats.record_expirations(expired);

        if self.policy.overflow(self.entries.len()) > 0 {
            debug!(
                len = self.entries.len(),
                cap = ?self.policy.config().max_entries,
                "Capacity exceeded by pinned entries"
            );
        }
    }

    /// Checks that the entry map and the LRU tracker hold the same keys.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        self.entries.len() == self.lru.len()
            && self.lru.iter_oldest_first().all(|key| self.entries.contains_key(key))
            && self
                .entries
                .values()
                .all(|entry| entry.last_access_at >= entry.created_at)
    }

    #[cfg(test)]
    pub(crate) fn keys_oldest_first(&self) -> Vec<String> {
        self.lru.iter_oldest_first().map(str::to_string).collect()
    }
}
