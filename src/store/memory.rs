// In-process stand-in for the shared store, used by unit tests.
//
// A single mutex makes every operation trivially atomic, which is exactly
// the guarantee the Redis script provides in production.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{KvStore, StoreError};

#[derive(Debug)]
enum Value {
    Bytes(Vec<u8>),
    Int(i64),
    Bucket { tokens: f64, last_refill: f64 },
}

#[derive(Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn live(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Instant::now() < deadline,
            None => true,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: peek at a bucket's current token count.
    pub fn bucket_tokens(&self, key: &str) -> Option<f64> {
        let map = self.inner.lock().ok()?;
        match map.get(key) {
            Some(Entry { value: Value::Bucket { tokens, .. }, .. }) => Some(*tokens),
            _ => None,
        }
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        // A poisoned mutex only happens when a test already panicked.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let map = self.locked();
        Ok(map.get(key).filter(|e| e.live()).map(|e| match &e.value {
            Value::Bytes(b) => b.clone(),
            Value::Int(i) => i.to_string().into_bytes(),
            Value::Bucket { tokens, .. } => tokens.to_string().into_bytes(),
        }))
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), StoreError> {
        let mut map = self.locked();
        map.insert(
            key.to_string(),
            Entry {
                value: Value::Bytes(value.to_vec()),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_secs)),
            },
        );
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: i64) -> Result<bool, StoreError> {
        let mut map = self.locked();
        let occupied = map.get(key).map(|e| e.live()).unwrap_or(false);
        if occupied {
            return Ok(false);
        }
        map.insert(
            key.to_string(),
            Entry { value: Value::Int(value), expires_at: None },
        );
        Ok(true)
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut map = self.locked();
        let current = match map.get(key).filter(|e| e.live()) {
            Some(Entry { value: Value::Int(i), .. }) => *i,
            Some(Entry { value: Value::Bytes(b), .. }) => std::str::from_utf8(b)
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(0),
            _ => 0,
        };
        let next = current + 1;
        map.insert(
            key.to_string(),
            Entry { value: Value::Int(next), expires_at: None },
        );
        Ok(next)
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
        let mut map = self.locked();
        let (mut tokens, last_refill) = match map.get(key).filter(|e| e.live()) {
            Some(Entry { value: Value::Bucket { tokens, last_refill }, .. }) => {
                (*tokens, *last_refill)
            }
            _ => (capacity as f64, now),
        };

        let elapsed = now - last_refill;
        tokens = (capacity as f64).min(tokens + elapsed * rate);

        let allowed = tokens >= requested as f64;
        if allowed {
            tokens -= requested as f64;
        }

        map.insert(
            key.to_string(),
            Entry {
                value: Value::Bucket { tokens, last_refill: now },
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_secs)),
            },
        );
        Ok(allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_what_set_ex_stored() {
        let store = MemoryStore::new();
        store.set_ex("k", b"value", 60).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"value".to_vec()));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let store = MemoryStore::new();
        store.set_ex("k", b"value", 0).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_nx_only_creates_once() {
        let store = MemoryStore::new();
        assert!(store.set_nx("version:u1", 1).await.unwrap());
        assert!(!store.set_nx("version:u1", 7).await.unwrap());
        assert_eq!(store.get("version:u1").await.unwrap(), Some(b"1".to_vec()));
    }

    #[tokio::test]
    async fn incr_initializes_and_counts() {
        let store = MemoryStore::new();
        assert_eq!(store.incr("c").await.unwrap(), 1);
        assert_eq!(store.incr("c").await.unwrap(), 2);
        assert_eq!(store.get("c").await.unwrap(), Some(b"2".to_vec()));
    }

    #[tokio::test]
    async fn incr_continues_from_a_set_nx_value() {
        let store = MemoryStore::new();
        store.set_nx("version:u1", 1).await.unwrap();
        assert_eq!(store.incr("version:u1").await.unwrap(), 2);
    }
}
