//! HTTP 请求处理器

pub mod balance;
pub mod health;
pub mod order;
pub mod user;

use axum::body::Bytes;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// 解析 JSON 请求体，无法解析时统一返回 400
fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))
}
