mod create;
mod list;
mod summary;

pub use create::create;
pub use list::list;
pub use summary::summary;

use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Cross-user access guard: the path subject must match the token subject.
pub(crate) fn verify_subject(user: &AuthUser, user_id: &str) -> Result<(), ApiError> {
    if user.user_id != user_id {
        return Err(ApiError::forbidden("You can only access your own data"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_subject_is_forbidden() {
        let user = AuthUser { user_id: "u1".into(), email: "a@b.c".into() };
        assert!(verify_subject(&user, "u1").is_ok());
        let err = verify_subject(&user, "u2").unwrap_err();
        assert_eq!(err.status_code(), 403);
    }
}
