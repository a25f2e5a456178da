//! HTTP 请求与响应 DTO
//!
//! 订单、余额、提现的响应体直接复用 `loyalty_ledger::dto`，保持对外字段名不变

use serde::{Deserialize, Serialize};
use validator::Validate;

/// 注册与登录共用的凭据
#[derive(Debug, Deserialize, Validate)]
pub struct Credentials {
    #[validate(length(min = 2, max = 255, message = "登录名长度必须在 2-255 之间"))]
    pub login: String,
    #[validate(length(min = 4, max = 72, message = "密码长度必须在 4-72 之间"))]
    pub password: String,
}

/// 提现请求
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    /// 抵扣的订单号
    pub order: String,
    pub sum: f64,
}

/// 注册、登录成功后返回的 Token
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: i64,
}

/// API 统一响应
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: Some(data),
        }
    }
}
