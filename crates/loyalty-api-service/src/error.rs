//! API 错误类型
//!
//! 将账本错误映射为对外的 HTTP 状态码，响应体统一为
//! `{success, code, message, data}` 结构

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use loyalty_ledger::LedgerError;
use serde_json::json;

/// API 错误类型
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // 认证错误
    #[error("未授权: {0}")]
    Unauthorized(String),
    #[error("用户名或密码错误")]
    InvalidCredentials,
    #[error("登录名已被占用: {0}")]
    LoginTaken(String),

    // 请求错误
    #[error("请求格式错误: {0}")]
    BadRequest(String),
    #[error("参数验证失败: {0}")]
    Validation(String),

    // 账本错误
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    // 系统错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("内部错误: {0}")]
    Internal(String),
}

/// API Result 类型别名
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::LoginTaken(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Ledger(e) => ledger_status(e),
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::LoginTaken(_) => "LOGIN_TAKEN",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Ledger(e) => e.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 系统错误对外只返回通用提示
    fn is_system_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

/// 账本错误到 HTTP 状态码的映射
fn ledger_status(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::InvalidFormat(_) | LedgerError::InvalidRequest(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        LedgerError::DuplicateOrder(_) | LedgerError::OrderNumberConflict(_) => {
            StatusCode::CONFLICT
        }
        LedgerError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
        // Token 有效但用户已不存在
        LedgerError::UserNotFound(_) => StatusCode::UNAUTHORIZED,
        LedgerError::UpstreamUnavailable(_)
        | LedgerError::UpstreamRateLimited { .. }
        | LedgerError::UpstreamRejected { .. }
        | LedgerError::MalformedUpstreamPayload(_)
        | LedgerError::Database(_)
        | LedgerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if self.is_system_error() {
            tracing::error!(error = %self, code = self.error_code(), "请求处理失败");
            "服务内部错误，请稍后重试".to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}
