//! 中间件模块

mod auth;

pub use auth::{AuthUser, TOKEN_COOKIE, auth_middleware, extract_token};
