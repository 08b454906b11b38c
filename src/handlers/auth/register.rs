// POST /auth/register - create a user and issue a JWT

use axum::Json;

use crate::database::{DatabaseManager, PgUserStore};
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::user::{CreateUser, Token};
use crate::services::user_service::UserService;

pub async fn register(Json(payload): Json<CreateUser>) -> ApiResult<Token> {
    let pool = DatabaseManager::pool().await?;
    let service = UserService::new(PgUserStore::new(pool));

    let user = service.register(payload).await?;
    let token = super::issue_token(&user.id, &user.email)?;

    Ok(ApiResponse::created(token))
}
