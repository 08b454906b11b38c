// Redis-backed shared store.
//
// One lazily-connected ConnectionManager per process, shared by the rate
// limiter, version oracle and query cache. When REDIS_HOST is unset or the
// initial connection fails, consumers see `None` and fall back to their
// fail-open behavior.

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::config;

use super::{KvStore, StoreError};

/// Continuous token bucket, executed server-side so concurrent checks for
/// the same identifier serialize inside Redis. Mirrors the bucket hash
/// layout: tokens + last_refill, TTL refreshed on every call.
const TOKEN_BUCKET_SCRIPT: &str = r#"
local key = KEYS[1]
local capacity = tonumber(ARGV[1])
local rate = tonumber(ARGV[2])
local now = tonumber(ARGV[3])
local requested = tonumber(ARGV[4])
local ttl = tonumber(ARGV[5])

local bucket = redis.call('HMGET', key, 'tokens', 'last_refill')
local tokens = tonumber(bucket[1]) or capacity
local last_refill = tonumber(bucket[2]) or now

local elapsed = now - last_refill
tokens = math.min(capacity, tokens + elapsed * rate)

if tokens < requested then
    redis.call('HMSET', key, 'tokens', tokens, 'last_refill', now)
    redis.call('EXPIRE', key, ttl)
    return 0
end

tokens = tokens - requested
redis.call('HMSET', key, 'tokens', tokens, 'last_refill', now)
redis.call('EXPIRE', key, ttl)
return 1
"#;

pub struct RedisStore {
    manager: redis::aio::ConnectionManager,
    bucket_script: redis::Script,
}

impl RedisStore {
    fn new(manager: redis::aio::ConnectionManager) -> Self {
        Self {
            manager,
            bucket_script: redis::Script::new(TOKEN_BUCKET_SCRIPT),
        }
    }
}

static SHARED: OnceCell<RedisStore> = OnceCell::const_new();

/// Process-wide store handle, connected on first use. `None` means the
/// store is disabled or unreachable right now; callers apply their
/// documented fail-open defaults.
pub async fn shared() -> Option<&'static RedisStore> {
    match SHARED.get_or_try_init(connect).await {
        Ok(store) => Some(store),
        Err(StoreError::Disabled) => None,
        Err(e) => {
            warn!("shared store connection failed: {}", e);
            None
        }
    }
}

async fn connect() -> Result<RedisStore, StoreError> {
    let cfg = &config::config().redis;
    let host = cfg.host.as_deref().ok_or(StoreError::Disabled)?;

    let url = format!("redis://{}:{}/", host, cfg.port);
    let client = redis::Client::open(url)?;

    let connect = client.get_connection_manager();
    let manager = tokio::time::timeout(
        std::time::Duration::from_secs(cfg.connect_timeout_secs),
        connect,
    )
    .await
    .map_err(|_| StoreError::Unavailable(format!("connect timeout to {}:{}", host, cfg.port)))??;

    // Fail fast if the server is not actually responding
    let mut conn = manager.clone();
    redis::cmd("PING")
        .query_async::<_, String>(&mut conn)
        .await?;

    info!("shared store connected: {}:{}", host, cfg.port);
    Ok(RedisStore::new(manager))
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.manager.clone();
        Ok(conn.get::<_, Option<Vec<u8>>>(key).await?)
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: i64) -> Result<bool, StoreError> {
        let mut conn = self.manager.clone();
        Ok(conn.set_nx::<_, _, bool>(key, value).await?)
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.manager.clone();
        Ok(conn.incr::<_, _, i64>(key, 1).await?)
    }

    async fn take_tokens(
        &self,
        key: &str,
        capacity: u32,
        rate: f64,
        now: f64,
        requested: u32,
        ttl_secs: u64,
    ) -> Result<bool, StoreError> {
        let mut conn = self.manager.clone();
        let allowed: i64 = self
            .bucket_script
            .key(key)
            .arg(capacity)
            .arg(rate)
            .arg(now)
            .arg(requested)
            .arg(ttl_secs)
            .invoke_async(&mut conn)
            .await?;
        Ok(allowed == 1)
    }
}
