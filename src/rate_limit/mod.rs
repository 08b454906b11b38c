// Token-bucket admission control.
//
// The bucket math runs inside the shared store as one atomic operation
// (see store::redis::TOKEN_BUCKET_SCRIPT), so concurrent requests for the
// same identifier serialize correctly even across server processes. This
// module owns key construction, tier selection and the fail-open policy.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::warn;

use crate::config;
use crate::store::{KvStore, StoreError};

/// A rate tier: steady-state refill rate (tokens/second) and burst capacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tier {
    pub rate: f64,
    pub capacity: u32,
}

/// Tier for requests carrying an authenticated subject.
pub fn authenticated_tier() -> Tier {
    let cfg = &config::config().rate_limit;
    Tier { rate: cfg.auth_rate, capacity: cfg.auth_capacity }
}

/// Tier for requests identified only by network origin.
pub fn anonymous_tier() -> Tier {
    let cfg = &config::config().rate_limit;
    Tier { rate: cfg.anon_rate, capacity: cfg.anon_capacity }
}

/// Deterministic-clock variant of [`check`], used directly by tests.
pub async fn check_at<S: KvStore + ?Sized>(
    store: &S,
    identifier: &str,
    tier: Tier,
    now: f64,
) -> Result<bool, StoreError> {
    let key = format!("ratelimit:{}", identifier);
    let ttl = config::config().rate_limit.bucket_ttl_secs;
    store
        .take_tokens(&key, tier.capacity, tier.rate, now, 1, ttl)
        .await
}

/// Check whether one request for `identifier` is admitted right now.
///
/// Admission is a protective layer, not a correctness guarantee: any store
/// failure logs a warning and allows the request.
pub async fn check<S: KvStore + ?Sized>(store: &S, identifier: &str, tier: Tier) -> bool {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64();

    match check_at(store, identifier, tier, now).await {
        Ok(allowed) => allowed,
        Err(e) => {
            warn!("rate limit check failed, allowing request: {}", e);
            true
        }
    }
}
