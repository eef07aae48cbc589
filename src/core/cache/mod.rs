//! Audio cache: deterministic keys, the expiring key-value store abstraction
//! with its memory, filesystem and Redis backends, and the read-through cache
//! the service uses.

mod audio_cache;
mod fingerprint;
mod redis_store;
pub mod store;

pub use audio_cache::{AudioCache, CacheCounts, CacheMetrics, ttl_from_seconds};
pub use fingerprint::{cache_key, canonical_voice_json, fingerprint};
pub use redis_store::RedisStore;
pub use store::{
    DEFAULT_MEMORY_ENTRIES, FilesystemStore, KeyValueStore, MemoryStore, StoreError, StoreResult,
};
