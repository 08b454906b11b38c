// POST /auth/login - verify credentials and issue a JWT

use axum::Json;

use crate::database::{DatabaseManager, PgUserStore};
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::user::{Login, Token};
use crate::services::user_service::UserService;

pub async fn login(Json(credentials): Json<Login>) -> ApiResult<Token> {
    let pool = DatabaseManager::pool().await?;
    let service = UserService::new(PgUserStore::new(pool));

    let user = service
        .verify_credentials(&credentials.email, &credentials.password)
        .await?;
    let token = super::issue_token(&user.id, &user.email)?;

    Ok(ApiResponse::success(token))
}
