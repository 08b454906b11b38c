// POST /users/:user_id/health-data - submit a health data entry

use axum::{extract::Path, Extension, Json};

use crate::cache;
use crate::database::{DatabaseManager, PgHealthStore};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::health::{HealthDataCreate, HealthEntry};
use crate::services::health_service::HealthService;
use crate::store;

pub async fn create(
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Json(payload): Json<HealthDataCreate>,
) -> ApiResult<HealthEntry> {
    super::verify_subject(&user, &user_id)?;

    let pool = DatabaseManager::pool().await?;
    let service = HealthService::new(PgHealthStore::new(pool));
    let entry = service.create(&user_id, payload).await?;

    // Orphan this subject's cached pages; they age out via TTL
    if let Some(kv) = store::redis::shared().await {
        cache::bump_version(kv, &user_id).await;
    }

    Ok(ApiResponse::created(entry))
}
