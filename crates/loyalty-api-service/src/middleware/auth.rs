//! JWT 认证中间件
//!
//! 只挂在受保护的路由上。Token 优先取 `Authorization: Bearer`，
//! 其次取名为 `token` 的 Cookie，校验通过后把 `AuthUser` 注入请求扩展。

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::state::AppState;

/// 登录成功后同时写入的 Cookie 名
pub const TOKEN_COOKIE: &str = "token";

/// 已认证用户，核心服务只接收其中的 `user_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
    pub login: String,
}

/// 认证中间件
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_token(request.headers()) else {
        return ApiError::Unauthorized("缺少认证 Token".to_string()).into_response();
    };

    let auth_user = state
        .jwt_manager
        .verify_token(&token)
        .and_then(|claims| {
            Ok(AuthUser {
                user_id: claims.user_id()?,
                login: claims.login,
            })
        });

    match auth_user {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// 从请求头中提取 Token
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
