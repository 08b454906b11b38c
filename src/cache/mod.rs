// Versioned read-through query cache.
//
// Cache keys embed a per-subject version counter:
//
//     <namespace>:<subject>:range:v<version>:<fingerprint>
//
// Write paths bump the version, which orphans every entry built under the
// prior version in O(1); stale entries are never scanned or deleted, they
// simply age out via TTL. A version bump racing a concurrent read may still
// serve a pre-bump result for up to the cache TTL, which is an accepted
// tradeoff, not a bug.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config;
use crate::store::KvStore;

/// The query parameters a cache entry is fingerprinted over. Field order is
/// the stable serialization order; changing it invalidates every key.
#[derive(Debug, Serialize)]
pub struct QueryFingerprint<'a> {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub cursor: Option<&'a str>,
    pub limit: i64,
}

impl QueryFingerprint<'_> {
    /// Short fixed-width hash: first 8 hex characters of SHA-256 over the
    /// stable serialization.
    pub fn digest(&self) -> String {
        let stable = serde_json::to_string(self).unwrap_or_default();
        let hash = Sha256::digest(stable.as_bytes());
        hash.iter().take(4).map(|b| format!("{:02x}", b)).collect()
    }
}

fn version_key(subject: &str) -> String {
    format!("version:{}", subject)
}

pub fn cache_key(subject: &str, version: i64, fingerprint: &str) -> String {
    let namespace = &config::config().cache.namespace;
    format!("{}:{}:range:v{}:{}", namespace, subject, version, fingerprint)
}

/// Current cache version for a subject, default-initialized to 1 via an
/// atomic create-if-absent. Store failures degrade to version 1.
pub async fn version<S: KvStore + ?Sized>(store: &S, subject: &str) -> i64 {
    let key = version_key(subject);
    match store.get(&key).await {
        Ok(Some(raw)) => std::str::from_utf8(&raw)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(1),
        Ok(None) => {
            if let Err(e) = store.set_nx(&key, 1).await {
                warn!("failed to initialize cache version for {}: {}", subject, e);
            }
            1
        }
        Err(e) => {
            warn!("failed to read cache version for {}: {}", subject, e);
            1
        }
    }
}

/// Atomically bump a subject's cache version, orphaning all entries keyed
/// under the prior version. Fire-and-forget: failures are logged, never
/// surfaced.
pub async fn bump_version<S: KvStore + ?Sized>(store: &S, subject: &str) {
    if let Err(e) = store.incr(&version_key(subject)).await {
        warn!("failed to bump cache version for {}: {}", subject, e);
    }
}

/// Read-through fetch. A hit deserializes and returns without invoking
/// `compute`; a miss invokes it and stores the serialized result with the
/// configured TTL. Any store problem on get or set degrades to calling
/// `compute` directly - the cache never turns store unavailability into a
/// request failure.
pub async fn fetch_or_compute<S, T, E, F, Fut>(
    store: Option<&S>,
    subject: &str,
    params: &QueryFingerprint<'_>,
    compute: F,
) -> Result<T, E>
where
    S: KvStore + ?Sized,
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let Some(store) = store else {
        return compute().await;
    };

    let version = version(store, subject).await;
    let key = cache_key(subject, version, &params.digest());

    match store.get(&key).await {
        Ok(Some(raw)) => match serde_json::from_slice(&raw) {
            Ok(value) => {
                debug!("cache hit: {}", key);
                return Ok(value);
            }
            Err(e) => {
                warn!("discarding undecodable cache entry {}: {}", key, e);
            }
        },
        Ok(None) => {}
        Err(e) => {
            warn!("cache read failed for {}: {}", key, e);
        }
    }

    let value = compute().await?;

    match serde_json::to_vec(&value) {
        Ok(raw) => {
            let ttl = config::config().cache.ttl_secs;
            if let Err(e) = store.set_ex(&key, &raw, ttl).await {
                warn!("cache write failed for {}: {}", key, e);
            }
        }
        Err(e) => {
            warn!("failed to serialize cache entry for {}: {}", key, e);
        }
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::{KvStore, StoreError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Store that errors on every call, for pass-through behavior.
    struct BrokenStore;

    #[async_trait]
    impl KvStore for BrokenStore {
        async fn get(&self, _: &str) -> Result<Option<Vec<u8>>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn set_ex(&self, _: &str, _: &[u8], _: u64) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn set_nx(&self, _: &str, _: i64) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn incr(&self, _: &str) -> Result<i64, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn take_tokens(
            &self,
            _: &str,
            _: u32,
            _: f64,
            _: f64,
            _: u32,
            _: u64,
        ) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    fn params() -> QueryFingerprint<'static> {
        QueryFingerprint { start: None, end: None, cursor: None, limit: 50 }
    }

    async fn counted_fetch(
        store: Option<&MemoryStore>,
        subject: &str,
        calls: &Arc<AtomicUsize>,
    ) -> Vec<i64> {
        let calls = Arc::clone(calls);
        let result: Result<Vec<i64>, StoreError> =
            fetch_or_compute(store, subject, &params(), || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![1, 2, 3])
            })
            .await;
        result.unwrap()
    }

    #[tokio::test]
    async fn identical_queries_compute_exactly_once() {
        let store = MemoryStore::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = counted_fetch(Some(&store), "u1", &calls).await;
        let second = counted_fetch(Some(&store), "u1", &calls).await;

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn version_bump_forces_recomputation() {
        let store = MemoryStore::new();
        let calls = Arc::new(AtomicUsize::new(0));

        counted_fetch(Some(&store), "u1", &calls).await;
        bump_version(&store, "u1").await;
        counted_fetch(Some(&store), "u1", &calls).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn version_initializes_to_one_and_increments() {
        let store = MemoryStore::new();
        assert_eq!(version(&store, "u1").await, 1);
        bump_version(&store, "u1").await;
        assert_eq!(version(&store, "u1").await, 2);
        bump_version(&store, "u1").await;
        assert_eq!(version(&store, "u1").await, 3);
    }

    #[tokio::test]
    async fn subjects_do_not_share_cache_entries() {
        let store = MemoryStore::new();
        let calls = Arc::new(AtomicUsize::new(0));

        counted_fetch(Some(&store), "u1", &calls).await;
        counted_fetch(Some(&store), "u2", &calls).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn broken_store_degrades_to_compute() {
        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let calls_inner = Arc::clone(&calls);
            let result: Result<Vec<i64>, StoreError> =
                fetch_or_compute(Some(&BrokenStore), "u1", &params(), || async move {
                    calls_inner.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![9])
                })
                .await;
            assert_eq!(result.unwrap(), vec![9]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_store_passes_through() {
        let calls = Arc::new(AtomicUsize::new(0));
        let result = counted_fetch(None, "u1", &calls).await;
        assert_eq!(result, vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fingerprint_is_short_stable_and_input_sensitive() {
        let a = params().digest();
        let b = params().digest();
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));

        let other = QueryFingerprint { start: None, end: None, cursor: None, limit: 25 };
        assert_ne!(a, other.digest());

        let with_cursor =
            QueryFingerprint { start: None, end: None, cursor: Some("abc"), limit: 50 };
        assert_ne!(a, with_cursor.digest());
    }

    #[test]
    fn cache_key_layout() {
        let key = cache_key("user123", 4, "deadbeef");
        assert_eq!(key, "health:user123:range:v4:deadbeef");
    }
}
