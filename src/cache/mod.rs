//! Cache Module
//!
//! Read-through caching over expensive aggregate queries: a fail-open store
//! client, the JSON codec, the cache-aside wrapper, and the invalidation and
//! freshness tracker that write paths call.

pub mod aside;
pub mod codec;
mod client;
mod entry;
pub mod freshness;
mod key;
mod stats;
mod store;


// Re-export public types
pub use aside::{CacheAside, CachePolicy, Cached};
pub use client::CacheClient;
pub use codec::{Cacheable, FieldValue, Fields, Payload, ToFields};
pub use entry::CacheEntry;
pub use freshness::{DataStatus, FreshnessTracker, InvalidationRegistry};
pub use key::{derive_key, KeyIndex, KeyParams};
pub use stats::{CacheStats, StatsSnapshot};
pub use store::{KvStore, MemoryStore, RedisStore};
