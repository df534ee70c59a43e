//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL and pin support.

use std::time::Duration;

use crate::cache::{Timestamp, ValueBox};

// == Cache Entry ==
/// Represents a single cache slot: the boxed value plus its metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: ValueBox,
    /// When the key was first written
    pub created_at: Timestamp,
    /// Last put or successful get, never earlier than `created_at`
    pub last_access_at: Timestamp,
    /// Idle time after which the entry expires, None = no expiration
    pub ttl: Option<Duration>,
    /// Pinned entries are never evicted or expired automatically
    pub pinned: bool,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped at `now`.
    pub fn new(value: ValueBox, ttl: Option<Duration>, pinned: bool, now: Timestamp) -> Self {
        Self {
            value,
            created_at: now,
            last_access_at: now,
            ttl,
            pinned,
        }
    }

    // == Touch ==
    /// Records an access at `now`.
    ///
    /// A clock that moved backwards cannot push `last_access_at` below
    /// `created_at`.
    pub fn touch(&mut self, now: Timestamp) {
        self.last_access_at = now.max(self.created_at);
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// Boundary condition: the entry is expired once the idle time since the
    /// last access is greater than or equal to the TTL. Pinned entries never
    /// expire.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        if self.pinned {
            return false;
        }
        match self.ttl {
            Some(ttl) => now.duration_since(self.last_access_at) >= ttl,
            None => false,
        }
    }

    /// Point in time at which the entry expires if left untouched.
    pub fn expires_at(&self) -> Option<Timestamp> {
        if self.pinned {
            return None;
        }
        self.ttl.map(|ttl| self.last_access_at.saturating_add(ttl))
    }

    // == Time To Live ==
    /// Returns remaining TTL, or None if the entry cannot expire.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the entry has expired
    /// - `Some(remaining)` if the entry has TTL and hasn't expired
    /// - `None` if the entry has no TTL or is pinned
    pub fn ttl_remaining(&self, now: Timestamp) -> Option<Duration> {
        self.expires_at().map(|expires| expires.duration_since(now))
    }
}
