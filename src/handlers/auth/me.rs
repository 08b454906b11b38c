// GET /auth/me - profile of the authenticated user

use axum::Extension;

use crate::database::{DatabaseManager, PgUserStore};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::user::UserPublic;
use crate::services::user_service::UserService;

pub async fn me(Extension(user): Extension<AuthUser>) -> ApiResult<UserPublic> {
    let pool = DatabaseManager::pool().await?;
    let service = UserService::new(PgUserStore::new(pool));

    let record = service
        .find_by_id(&user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(ApiResponse::success(UserPublic::from(record)))
}
