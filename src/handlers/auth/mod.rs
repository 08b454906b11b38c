mod login;
mod me;
mod register;

pub use login::login;
pub use me::me;
pub use register::register;

use crate::config;
use crate::models::user::Token;

/// Token payload shared by register and login.
pub(crate) fn issue_token(user_id: &str, email: &str) -> Result<Token, crate::error::ApiError> {
    let claims = crate::auth::Claims::new(user_id, email);
    let access_token = crate::auth::generate_jwt(&claims)?;
    Ok(Token {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: config::config().security.token_expiry_minutes * 60,
    })
}
