//! Key-value store boundary used by the response cache.
//!
//! The cache only needs plain string values, TTL writes, set membership and
//! key-pattern enumeration. Backends report their own readiness so callers can
//! fail open without issuing a command.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key-value store is disconnected")]
    Disconnected,
    #[error("store command `{op}` timed out")]
    Timeout { op: &'static str },
    #[error("store command `{op}` failed: {message}")]
    Backend { op: &'static str, message: String },
    #[error("key `{key}` holds the wrong kind of value")]
    WrongType { key: String },
}

impl StoreError {
    pub fn backend(op: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Backend {
            op,
            message: err.to_string(),
        }
    }
}

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Whether the store currently accepts commands.
    fn is_ready(&self) -> bool;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Returns true when a key was actually removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    async fn set_add(&self, set: &str, member: &str) -> Result<(), StoreError>;

    async fn set_remove(&self, set: &str, member: &str) -> Result<(), StoreError>;

    async fn set_members(&self, set: &str) -> Result<Vec<String>, StoreError>;

    /// Set cardinality; 0 for a missing set.
    async fn set_len(&self, set: &str) -> Result<usize, StoreError>;

    /// Enumerate keys matching a glob pattern (`*`, `?`, `[...]`).
    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, StoreError>;
}
