//! Cache Module
//!
//! Typed in-process caching with TTL expiration, LRU eviction and pinning.

mod clock;
mod engine;
mod entry;
mod lru;
mod options;
mod policy;
mod stats;
mod table;
mod value;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock, Timestamp};
pub use engine::CacheEngine;
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use options::{Expiry, PutOptions};
pub use policy::{EvictionPolicy, EvictionStrategy, PolicyConfig, VictimScope};
pub use stats::CacheStats;
pub use table::CacheTable;
pub use value::{TypeTag, ValueBox};

// == Public Constants ==
/// Default maximum key length in bytes
pub const MAX_KEY_LENGTH: usize = 1024;
