//! Session Registry
//!
//! Named sessions, each owning one cache engine. Opening a session creates
//! its cache; closing it tears the cache down.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::cache::{CacheEngine, Clock, PolicyConfig, SystemClock, Timestamp, MAX_KEY_LENGTH};
use crate::config::Config;
use crate::error::{CacheError, Result};

/// Registry of open sessions.
///
/// Every session's engine shares the registry's policy and clock.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<CacheEngine>>>,
    policy: PolicyConfig,
    clock: Arc<dyn Clock>,
    max_key_length: usize,
}

impl SessionRegistry {
    // == Constructors ==
    /// Creates an empty registry. The policy is validated up front so that
    /// opening a session cannot fail on configuration.
    pub fn new(policy: PolicyConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        policy.validate()?;
        Ok(Self {
            sessions: RwLock::new(HashMap::new()),
            policy,
            clock,
            max_key_length: MAX_KEY_LENGTH,
        })
    }

    /// Creates a registry from host configuration, on the system clock.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::new(config.policy(), Arc::new(SystemClock))?;
        registry.max_key_length = config.max_key_length;
        Ok(registry)
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // == Open ==
    /// Returns the session's engine, creating it if the session is new.
    ///
    /// # Errors
    /// `InvalidSession` for an empty name.
    pub fn open(&self, name: &str) -> Result<Arc<CacheEngine>> {
        if name.is_empty() {
            return Err(CacheError::InvalidSession(
                "Session name cannot be empty".to_string(),
            ));
        }

        if let Some(engine) = self.sessions.read().get(name) {
            return Ok(Arc::clone(engine));
        }

        let mut sessions = self.sessions.write();
        if let Some(engine) = sessions.get(name) {
            return Ok(Arc::clone(engine));
        }

        let engine = CacheEngine::with_clock(self.policy.clone(), Arc::clone(&self.clock))?
            .with_max_key_length(self.max_key_length);
        let engine = Arc::new(engine);
        sessions.insert(name.to_string(), Arc::clone(&engine));
        info!(session = %name, "Session opened");
        Ok(engine)
    }

    // == Get ==
    /// # Errors
    /// `UnknownSession` if no session is open under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<CacheEngine>> {
        self.sessions
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CacheError::UnknownSession(name.to_string()))
    }

    // == Close ==
    /// Tears the session down, dropping every entry it held. Returns whether
    /// the session existed.
    pub fn close(&self, name: &str) -> bool {
        let Some(engine) = self.sessions.write().remove(name) else {
            return false;
        };
        let dropped = engine.clear();
        info!(session = %name, dropped, "Session closed");
        true
    }

    // == Sweep ==
    /// Sweeps every open session at `now`. Returns the total removed.
    pub fn sweep_all(&self, now: Timestamp) -> usize {
        let engines: Vec<Arc<CacheEngine>> = self.sessions.read().values().cloned().collect();
        engines.iter().map(|engine| engine.sweep(now)).sum()
    }

    /// Open session names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sessions.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{EvictionStrategy, ManualClock, PutOptions};
    use std::time::Duration;

    fn registry() -> (SessionRegistry, ManualClock) {
        let clock = ManualClock::new(Timestamp::from_millis(0));
        let policy = PolicyConfig::lru(10)
            .with_default_ttl(Duration::from_secs(60))
            .with_strategy(EvictionStrategy::Both);
        let registry = SessionRegistry::new(policy, Arc::new(clock.clone())).unwrap();
        (registry, clock)
    }

    #[test]
    fn test_registry_rejects_invalid_policy() {
        let result = SessionRegistry::new(PolicyConfig::lru(0), Arc::new(SystemClock));
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_open_is_create_or_get() {
        let (registry, _) = registry();

        let first = registry.open("world").unwrap();
        first.put("k", 1_u8).unwrap();
        let second = registry.open("world").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
        assert!(second.contains("k"));
    }

    #[test]
    fn test_open_empty_name() {
        let (registry, _) = registry();
        assert!(matches!(
            registry.open(""),
            Err(CacheError::InvalidSession(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_get_unknown_session() {
        let (registry, _) = registry();
        assert_eq!(
            registry.get("nope").unwrap_err(),
            CacheError::UnknownSession("nope".to_string())
        );
    }

    #[test]
    fn test_sessions_are_isolated() {
        let (registry, _) = registry();

        registry.open("a").unwrap().put("k", 1_u8).unwrap();
        registry.open("b").unwrap();

        assert!(registry.get("a").unwrap().contains("k"));
        assert!(!registry.get("b").unwrap().contains("k"));
    }

    #[test]
    fn test_close_tears_down_cache() {
        let (registry, _) = registry();
        let engine = registry.open("a").unwrap();
        engine
            .put_with("k", 1_u8, PutOptions::new().pinned(true))
            .unwrap();

        assert!(registry.close("a"));
        assert!(!registry.close("a"));
        assert!(registry.get("a").is_err());
        // Handles held elsewhere see an empty cache
        assert_eq!(engine.size(), 0);

        let reopened = registry.open("a").unwrap();
        assert!(!reopened.contains("k"));
    }

    #[test]
    fn test_sweep_all_sessions() {
        let (registry, clock) = registry();
        registry.open("a").unwrap().put("x", 1_u8).unwrap();
        registry.open("b").unwrap().put("y", 2_u8).unwrap();
        registry
            .open("b")
            .unwrap()
            .put_with("z", 3_u8, PutOptions::new().no_expiry())
            .unwrap();

        clock.advance(Duration::from_secs(60));

        assert_eq!(registry.sweep_all(clock.now()), 2);
        assert_eq!(registry.sweep_all(clock.now()), 0);
        assert_eq!(registry.get("b").unwrap().size(), 1);
    }

    #[test]
    fn test_names_sorted() {
        let (registry, _) = registry();
        registry.open("zeta").unwrap();
        registry.open("alpha").unwrap();

        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_from_config_applies_key_limit() {
        let config = Config {
            max_key_length: 4,
            ..Config::default()
        };
        let registry = SessionRegistry::from_config(&config).unwrap();
        let engine = registry.open("s").unwrap();

        assert!(engine.put("abcd", 1_u8).is_ok());
        assert!(matches!(
            engine.put("abcde", 1_u8),
            Err(CacheError::InvalidKey(_))
        ));
    }
}
