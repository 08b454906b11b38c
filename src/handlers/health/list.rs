// GET /users/:user_id/health-data - paginated range query

use axum::extract::{Path, Query};
use axum::Extension;

use crate::cache::{self, QueryFingerprint};
use crate::database::{DatabaseManager, PgHealthStore};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::health::{HealthDataQuery, PaginatedHealthData};
use crate::services::health_service::{
    clamp_limit, parse_dd_mm_yyyy, HealthService, DEFAULT_PAGE_LIMIT,
};
use crate::store;

pub async fn list(
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Query(query): Query<HealthDataQuery>,
) -> ApiResult<PaginatedHealthData> {
    super::verify_subject(&user, &user_id)?;

    let start = parse_dd_mm_yyyy(&query.start)?;
    let end = parse_dd_mm_yyyy(&query.end)?;
    if start > end {
        return Err(ApiError::bad_request(
            "start must be before or equal to end",
        ));
    }

    let limit = clamp_limit(query.limit.unwrap_or(DEFAULT_PAGE_LIMIT));
    let cursor = query.cursor.as_deref();

    let pool = DatabaseManager::pool().await?;
    let service = HealthService::new(PgHealthStore::new(pool));

    let params = QueryFingerprint {
        start: Some(start),
        end: Some(end),
        cursor,
        limit,
    };
    let kv = store::redis::shared().await;

    let page = cache::fetch_or_compute(kv, &user_id, &params, || async {
        let (data, next_cursor, has_more) = service
            .query(&user_id, Some(start), Some(end), cursor, limit)
            .await?;
        Ok::<_, ApiError>(PaginatedHealthData {
            data,
            next_cursor,
            has_more,
            limit,
        })
    })
    .await?;

    Ok(ApiResponse::success(page))
}
