//! Cache Engine Module
//!
//! The façade a host embeds: one lock around one table, a clock, and a sweep
//! hook the host calls from its own timer.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{
    CacheStats, CacheTable, Clock, EvictionPolicy, PolicyConfig, PutOptions, SystemClock,
    Timestamp, ValueBox,
};
use crate::error::Result;

// == Cache Engine ==
/// Thread-safe cache engine.
///
/// Every operation, reads included, takes the same exclusive lock: a read
/// refreshes recency and may expire the entry it looks at, so there is no
/// shared-read path. Nothing here spawns threads; expired entries that are
/// never read again are removed when the host calls [`CacheEngine::sweep`].
#[derive(Debug)]
pub struct CacheEngine {
    table: Mutex<CacheTable>,
    clock: Arc<dyn Clock>,
}

impl CacheEngine {
    // == Constructors ==
    /// Creates an engine reading the system wall clock.
    ///
    /// # Errors
    /// `InvalidConfig` if the policy configuration is rejected.
    pub fn new(config: PolicyConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an engine reading time from `clock`.
    pub fn with_clock(config: PolicyConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let policy = EvictionPolicy::new(config)?;
        debug!(
            strategy = %policy.strategy(),
            max_entries = ?policy.config().max_entries,
            default_ttl = ?policy.config().default_ttl,
            "Cache engine created"
        );

        Ok(Self {
            table: Mutex::new(CacheTable::new(policy)),
            clock,
        })
    }

    /// Overrides the key length limit (bytes).
    pub fn with_max_key_length(self, max_key_length: usize) -> Self {
        let table = self.table.into_inner().with_max_key_length(max_key_length);
        Self {
            table: Mutex::new(table),
            clock: self.clock,
        }
    }

    // == Writes ==
    /// Stores `value` under `key` with default options.
    pub fn put<T: Any + Clone + Send + Sync>(&self, key: &str, value: T) -> Result<()> {
        self.put_box(key, ValueBox::new(value), PutOptions::default())
    }

    /// Stores `value` under `key` with explicit TTL/pin options.
    pub fn put_with<T: Any + Clone + Send + Sync>(
        &self,
        key: &str,
        value: T,
        opts: PutOptions,
    ) -> Result<()> {
        self.put_box(key, ValueBox::new(value), opts)
    }

    /// Stores an already boxed value, e.g. a shared payload.
    pub fn put_box(&self, key: &str, value: ValueBox, opts: PutOptions) -> Result<()> {
        let mut table = self.table.lock();
        let now = self.clock.now();
        table.put(key, value, opts, now)
    }

    // == Reads ==
    /// Returns a copy of the boxed value, or None on a miss.
    pub fn get(&self, key: &str) -> Option<ValueBox> {
        let mut table = self.table.lock();
        let now = self.clock.now();
        table.get(key, now)
    }

    /// Returns the value as a `T`, or None on a miss.
    ///
    /// # Errors
    /// `TypeMismatch` if the stored value is not a `T`; the entry is kept.
    pub fn get_as<T: Any + Clone>(&self, key: &str) -> Result<Option<T>> {
        let mut table = self.table.lock();
        let now = self.clock.now();
        table.get_as(key, now)
    }

    /// Like [`get_as`](Self::get_as), also returning the TTL left after the
    /// access, read under the same lock.
    pub fn get_as_with_ttl<T: Any + Clone>(
        &self,
        key: &str,
    ) -> Result<Option<(T, Option<Duration>)>> {
        let mut table = self.table.lock();
        let now = self.clock.now();
        let Some(value) = table.get_as::<T>(key, now)? else {
            return Ok(None);
        };
        let ttl = table.entry(key).and_then(|entry| entry.ttl_remaining(now));
        Ok(Some((value, ttl)))
    }

    /// Checks for a live entry without counting as an access.
    pub fn contains(&self, key: &str) -> bool {
        let table = self.table.lock();
        table.contains(key, self.clock.now())
    }

    /// Remaining idle time before `key` expires, None if it is absent, pinned
    /// or has no TTL.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let table = self.table.lock();
        let now = self.clock.now();
        if !table.contains(key, now) {
            return None;
        }
        table.entry(key).and_then(|entry| entry.ttl_remaining(now))
    }

    // == Removal ==
    /// Removes `key`. Returns whether it existed.
    pub fn remove(&self, key: &str) -> bool {
        self.table.lock().remove(key)
    }

    /// Removes every entry including pinned ones. Returns how many went.
    pub fn clear(&self) -> usize {
        let removed = self.table.lock().clear();
        debug!(removed, "Cache engine cleared");
        removed
    }

    // == Sweep ==
    /// Removes entries whose TTL elapsed at `now`. Returns the count.
    ///
    /// Meant to be called from the host's periodic tick. Calling it again with
    /// the same `now` and no writes in between removes nothing.
    pub fn sweep(&self, now: Timestamp) -> usize {
        let removed = self.table.lock().sweep(now);
        if removed > 0 {
            debug!(removed, %now, "Sweep removed expired entries");
        }
        removed
    }

    // == Introspection ==
    /// Current time on this engine's clock.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Number of stored entries, expired-but-unswept ones included.
    pub fn size(&self) -> usize {
        self.table.lock().len()
    }

    /// Enforced entry cap, None when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.table.lock().capacity()
    }

    pub fn stats(&self) -> CacheStats {
        self.table.lock().stats()
    }

    pub fn config(&self) -> PolicyConfig {
        self.table.lock().policy().config().clone()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{EvictionStrategy, ManualClock};
    use crate::error::CacheError;

    #[derive(Debug, Clone, PartialEq)]
    struct PlayerState {
        name: String,
        level: u32,
    }

    fn engine(config: PolicyConfig) -> (CacheEngine, ManualClock) {
        let clock = ManualClock::new(Timestamp::from_millis(1_000));
        let engine = CacheEngine::with_clock(config, Arc::new(clock.clone())).unwrap();
        (engine, clock)
    }

    #[test]
    fn test_engine_rejects_invalid_config() {
        let result = CacheEngine::new(PolicyConfig::lru(0));
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_engine_put_get_struct() {
        let (engine, _) = engine(PolicyConfig::default());
        let state = PlayerState {
            name: "hippo".to_string(),
            level: 7,
        };

        engine.put("player", state.clone()).unwrap();

        assert_eq!(engine.get_as::<PlayerState>("player").unwrap(), Some(state));
        assert!(engine.get("player").unwrap().is::<PlayerState>());
        assert_eq!(engine.get_as::<PlayerState>("missing").unwrap(), None);
    }

    #[test]
    fn test_engine_put_twice_replaces() {
        let (engine, _) = engine(PolicyConfig::default());

        engine.put("k", 1_i32).unwrap();
        engine.put("k", 2_i32).unwrap();

        assert_eq!(engine.get_as::<i32>("k").unwrap(), Some(2));
        assert_eq!(engine.size(), 1);
    }

    #[test]
    fn test_engine_replace_may_change_type() {
        let (engine, _) = engine(PolicyConfig::default());

        engine.put("k", 1_i32).unwrap();
        engine.put("k", "text".to_string()).unwrap();

        assert!(engine.get_as::<i32>("k").is_err());
        assert_eq!(engine.get_as::<String>("k").unwrap(), Some("text".to_string()));
    }

    #[test]
    fn test_engine_ttl_expiry_with_clock() {
        let (engine, clock) = engine(PolicyConfig::default());

        engine
            .put_with("k", 1_u8, PutOptions::new().ttl(Duration::from_secs(1)))
            .unwrap();
        engine.put("other", 2_u8).unwrap();
        assert_eq!(engine.size(), 2);
        assert_eq!(engine.ttl_remaining("k"), Some(Duration::from_secs(1)));

        clock.advance(Duration::from_secs(1));

        assert!(engine.get("k").is_none());
        assert_eq!(engine.size(), 1);
        assert_eq!(engine.ttl_remaining("k"), None);
    }

    #[test]
    fn test_engine_zero_ttl_never_expires() {
        let (engine, clock) = engine(PolicyConfig::default());

        engine
            .put_with("k", 1_u8, PutOptions::new().ttl(Duration::ZERO))
            .unwrap();
        clock.advance(Duration::from_secs(3600));

        assert_eq!(engine.get_as::<u8>("k").unwrap(), Some(1));
        assert_eq!(engine.ttl_remaining("k"), None);
    }

    #[test]
    fn test_engine_get_with_ttl_reports_refreshed_ttl() {
        let (engine, clock) = engine(PolicyConfig::default());
        engine
            .put_with("k", 7_u32, PutOptions::new().ttl(Duration::from_secs(10)))
            .unwrap();
        engine
            .put_with("pinned", 1_u32, PutOptions::new().pinned(true))
            .unwrap();

        clock.advance(Duration::from_secs(4));

        // The read slides the TTL before it is reported
        assert_eq!(
            engine.get_as_with_ttl::<u32>("k").unwrap(),
            Some((7, Some(Duration::from_secs(10))))
        );
        assert_eq!(engine.get_as_with_ttl::<u32>("pinned").unwrap(), Some((1, None)));
        assert_eq!(engine.get_as_with_ttl::<u32>("missing").unwrap(), None);
        assert!(engine.get_as_with_ttl::<String>("k").is_err());
    }

    #[test]
    fn test_engine_pin_overrides_lru() {
        let (engine, _) = engine(PolicyConfig::lru(1));

        engine
            .put_with("a", 1_u8, PutOptions::new().pinned(true))
            .unwrap();
        engine.put("b", 2_u8).unwrap();

        assert!(engine.contains("a"));
        assert_eq!(engine.capacity(), Some(1));
    }

    #[test]
    fn test_engine_lru_ordering() {
        let (engine, clock) = engine(PolicyConfig::lru(2));

        engine.put("a", 1_u8).unwrap();
        clock.advance(Duration::from_millis(1));
        engine.put("b", 2_u8).unwrap();
        clock.advance(Duration::from_millis(1));
        engine.get("a");
        clock.advance(Duration::from_millis(1));
        engine.put("c", 3_u8).unwrap();

        assert!(engine.contains("a"));
        assert!(!engine.contains("b"));
        assert!(engine.contains("c"));
        assert_eq!(engine.stats().evictions, 1);
    }

    #[test]
    fn test_engine_clear_includes_pinned() {
        let (engine, _) = engine(PolicyConfig::default());

        engine
            .put_with("a", 1_u8, PutOptions::new().pinned(true))
            .unwrap();
        engine.put("b", 2_u8).unwrap();

        assert_eq!(engine.clear(), 2);
        assert_eq!(engine.size(), 0);
        assert!(!engine.contains("a"));
        assert!(!engine.contains("b"));
    }

    #[test]
    fn test_engine_sweep_idempotent() {
        let (engine, clock) = engine(PolicyConfig::ttl(Duration::from_secs(5)));

        engine.put("a", 1_u8).unwrap();
        engine.put("b", 2_u8).unwrap();
        engine
            .put_with("c", 3_u8, PutOptions::new().no_expiry())
            .unwrap();

        clock.advance(Duration::from_secs(5));
        let now = engine.now();

        assert_eq!(engine.sweep(now), 2);
        assert_eq!(engine.sweep(now), 0);
        assert_eq!(engine.size(), 1);
        assert_eq!(engine.stats().expirations, 2);
    }

    #[test]
    fn test_engine_type_mismatch_keeps_entry() {
        let (engine, _) = engine(PolicyConfig::default());

        engine.put("k", 42_u64).unwrap();
        let result = engine.get_as::<String>("k");

        assert!(matches!(result, Err(CacheError::TypeMismatch { .. })));
        assert!(engine.contains("k"));
        assert_eq!(engine.size(), 1);
    }

    #[test]
    fn test_engine_shared_payload() {
        let (engine, _) = engine(PolicyConfig::default());
        let level = Arc::new(vec![1_u8, 2, 3]);

        engine
            .put_box("level", ValueBox::shared(Arc::clone(&level)), PutOptions::new())
            .unwrap();

        let boxed = engine.get("level").unwrap();
        assert!(boxed.is_shared());
        assert!(std::ptr::eq(
            boxed.downcast_ref::<Vec<u8>>().unwrap(),
            level.as_ref()
        ));
    }

    #[test]
    fn test_engine_invalid_key_leaves_table_unchanged() {
        let (engine, _) = engine(PolicyConfig::default());

        engine.put("k", 1_u8).unwrap();
        assert!(matches!(engine.put("", 2_u8), Err(CacheError::InvalidKey(_))));
        assert_eq!(engine.size(), 1);
    }

    #[test]
    fn test_engine_custom_key_limit() {
        let (engine, _) = engine(PolicyConfig::default());
        let engine = engine.with_max_key_length(8);

        assert!(engine.put("12345678", 1_u8).is_ok());
        assert!(engine.put("123456789", 1_u8).is_err());
    }

    #[test]
    fn test_engine_config_is_fixed() {
        let config = PolicyConfig::lru(10).with_strategy(EvictionStrategy::Both);
        let (engine, _) = engine(config.clone());

        assert_eq!(engine.config(), config);
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CacheEngine>();
    }
}
