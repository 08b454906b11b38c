// Shared key-value store abstraction.
//
// The rate limiter, version oracle and query cache only need a tiny
// capability set: get, set-with-ttl, set-if-absent, increment, and one
// server-side atomic token-bucket evaluation. Keeping the trait this small
// lets tests substitute an in-memory fake and keeps a stricter fail-closed
// variant swappable without touching call sites.

use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod redis;

#[derive(Debug, Error)]
pub enum StoreError {
    /// No store is configured (REDIS_HOST unset). Consumers fail open.
    #[error("shared store is not configured")]
    Disabled,

    #[error("shared store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Redis(#[from] ::redis::RedisError),
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn set_ex(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), StoreError>;

    /// Atomic create-if-absent. Returns true when the key was created.
    async fn set_nx(&self, key: &str, value: i64) -> Result<bool, StoreError>;

    /// Atomic increment, initializing to 1 when the key is absent.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Atomic token-bucket evaluation: refill from `now`, then try to take
    /// `requested` tokens. The whole read-modify-write executes as one
    /// indivisible operation against the store, and the bucket TTL is
    /// refreshed on every call.
    async fn take_tokens(
        &self,
        key: &str,
        capacity: u32,
        rate: f64,
        now: f64,
        requested: u32,
        ttl_secs: u64,
    ) -> Result<bool, StoreError>;
}
