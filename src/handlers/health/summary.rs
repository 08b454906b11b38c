// GET /users/:user_id/health-data/summary - aggregate over a date range

use axum::extract::{Path, Query};
use axum::Extension;

use crate::cache::{self, QueryFingerprint};
use crate::database::{DatabaseManager, PgHealthStore};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::health::{HealthSummary, HealthSummaryQuery};
use crate::services::health_service::{parse_dd_mm_yyyy, HealthService};
use crate::store;

/// Fingerprint limit for summary entries. Distinguishes them from list pages
/// in the shared per-subject keyspace.
const SUMMARY_FINGERPRINT_LIMIT: i64 = 10_000;

pub async fn summary(
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Query(query): Query<HealthSummaryQuery>,
) -> ApiResult<HealthSummary> {
    super::verify_subject(&user, &user_id)?;

    let start = parse_dd_mm_yyyy(&query.start_date)?;
    let end = parse_dd_mm_yyyy(&query.end_date)?;
    if start > end {
        return Err(ApiError::bad_request(
            "start_date must be before or equal to end_date",
        ));
    }

    let pool = DatabaseManager::pool().await?;
    let service = HealthService::new(PgHealthStore::new(pool));

    let params = QueryFingerprint {
        start: Some(start),
        end: Some(end),
        cursor: None,
        limit: SUMMARY_FINGERPRINT_LIMIT,
    };
    let kv = store::redis::shared().await;

    let summary = cache::fetch_or_compute(kv, &user_id, &params, || async {
        service
            .summary(&user_id, start, end)
            .await
            .map_err(ApiError::from)
    })
    .await?;

    Ok(ApiResponse::success(summary))
}
