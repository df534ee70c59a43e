//! Hippocache - A typed in-process key-value cache engine
//!
//! Stores arbitrary Rust values under string keys with TTL expiration, LRU
//! eviction and pinning. The engine owns no threads: hosts drive expiry by
//! calling [`CacheEngine::sweep`] from their own timer.
//!
//! ```
//! use hippocache::{CacheEngine, PolicyConfig};
//!
//! let cache = CacheEngine::new(PolicyConfig::lru(2)).unwrap();
//! cache.put("answer", 42_u32).unwrap();
//! assert_eq!(cache.get_as::<u32>("answer").unwrap(), Some(42));
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod host;

pub use cache::{
    CacheEngine, CacheStats, Clock, EvictionStrategy, Expiry, ManualClock, PolicyConfig,
    PutOptions, SystemClock, Timestamp, ValueBox,
};
pub use config::Config;
pub use error::{CacheError, Result};
pub use host::{spawn_sweep_task, SessionRegistry};
