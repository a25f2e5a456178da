//! 用户注册与登录
//!
//! 成功时 Token 同时放在 `Authorization` 响应头、`token` Cookie 和响应体中

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::auth::{hash_password, verify_password};
use crate::dto::{ApiResponse, Credentials, TokenResponse};
use crate::error::{ApiError, Result};
use crate::handlers::parse_json;
use crate::middleware::TOKEN_COOKIE;
use crate::state::AppState;

/// 注册并直接登录
///
/// POST /api/user/register
#[instrument(skip(state, body))]
pub async fn register(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let credentials: Credentials = parse_json(&body)?;
    credentials.validate()?;

    let password_hash = hash_password(&credentials.password)?;
    let user = state
        .user_repo
        .create_user(&credentials.login, &password_hash)
        .await?;

    info!(user_id = user.id, login = %user.login, "用户注册成功");
    token_response(&state, user.id, &user.login)
}

/// 登录
///
/// POST /api/user/login
#[instrument(skip(state, body))]
pub async fn login(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let credentials: Credentials = parse_json(&body)?;
    credentials.validate()?;

    let Some(user) = state.user_repo.find_by_login(&credentials.login).await? else {
        warn!(login = %credentials.login, "登录失败: 用户不存在");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(&credentials.password, &user.password_hash)? {
        warn!(user_id = user.id, "登录失败: 密码错误");
        return Err(ApiError::InvalidCredentials);
    }

    info!(user_id = user.id, "用户登录成功");
    token_response(&state, user.id, &user.login)
}

fn token_response(state: &AppState, user_id: i64, login: &str) -> Result<Response> {
    let (token, expires_at) = state.jwt_manager.generate_token(user_id, login)?;

    let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| ApiError::Internal(format!("Token 无法写入响应头: {e}")))?;
    let cookie = HeaderValue::from_str(&format!(
        "{TOKEN_COOKIE}={token}; Path=/; HttpOnly; Max-Age={}",
        state.jwt_manager.expires_in_secs()
    ))
    .map_err(|e| ApiError::Internal(format!("Token 无法写入 Cookie: {e}")))?;

    let mut response = (
        StatusCode::OK,
        Json(ApiResponse::success(TokenResponse { token, expires_at })),
    )
        .into_response();
    response.headers_mut().insert(header::AUTHORIZATION, bearer);
    response.headers_mut().insert(header::SET_COOKIE, cookie);

    Ok(response)
}
