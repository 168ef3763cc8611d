//! Agora response cache.
//!
//! A read-through cache for JSON GET routes, stored in an external key-value
//! store (Redis, or an in-process map), with set-based registries so writes
//! can purge what they dirty without scanning the keyspace.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! backend = "redis"
//! redis_url = "redis://127.0.0.1:6379"
//! default_ttl_seconds = 60
//! # ... see config.rs for all options
//! ```

mod config;
mod keys;
mod memory;
mod middleware;
mod redis;
mod registry;
mod store;
mod trigger;

pub use config::{CacheConfig, StoreBackend};
pub use keys::{CacheKey, Category, GLOBAL_REGISTRY_KEY, category_registry_key};
pub use memory::MemoryStore;
pub use middleware::{CacheState, HIT_MARKER, RouteCache, response_cache_layer};
pub use redis::RedisStore;
pub use registry::CacheRegistry;
pub use store::{KvStore, StoreError};
pub use trigger::{
    CacheTrigger, InvalidationTarget, ParentResolver, RouteInvalidation, invalidate_on_success,
};
