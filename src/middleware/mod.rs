pub mod auth;
pub mod rate_limit;
pub mod response;

pub use auth::{identity_middleware, jwt_auth_middleware, AuthUser};
pub use rate_limit::rate_limit_middleware;
pub use response::{ApiResponse, ApiResult};
