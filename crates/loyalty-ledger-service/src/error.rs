//! 积分账本错误类型
//!
//! 定义服务层的业务错误和系统错误

use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

/// 积分账本错误类型
#[derive(Debug, Error)]
pub enum LedgerError {
    // === 订单相关错误 ===
    #[error("订单号格式错误: {0}")]
    InvalidFormat(String),

    #[error("订单号已存在: {0}")]
    DuplicateOrder(String),

    #[error("订单号已被其他用户提交: {0}")]
    OrderNumberConflict(String),

    // === 余额相关错误 ===
    #[error("请求参数无效: {0}")]
    InvalidRequest(String),

    #[error("积分不足: 需要 {requested}, 可用 {available}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },

    #[error("用户不存在: {0}")]
    UserNotFound(i64),

    // === 积分计算系统相关错误 ===
    #[error("积分计算系统不可用: {0}")]
    UpstreamUnavailable(String),

    #[error("积分计算系统限流，{retry_after:?} 后重试")]
    UpstreamRateLimited { retry_after: Duration },

    #[error("积分计算系统返回非预期状态码: {status}")]
    UpstreamRejected { status: u16 },

    #[error("积分计算系统响应格式错误: {0}")]
    MalformedUpstreamPayload(String),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 积分账本 Result 类型别名
pub type Result<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::UpstreamUnavailable(_) | Self::UpstreamRateLimited { .. }
        )
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFormat(_)
                | Self::DuplicateOrder(_)
                | Self::OrderNumberConflict(_)
                | Self::InvalidRequest(_)
                | Self::InsufficientFunds { .. }
                | Self::UserNotFound(_)
        )
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidFormat(_) => "INVALID_ORDER_NUMBER",
            Self::DuplicateOrder(_) => "DUPLICATE_ORDER",
            Self::OrderNumberConflict(_) => "ORDER_NUMBER_CONFLICT",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            Self::UpstreamRateLimited { .. } => "UPSTREAM_RATE_LIMITED",
            Self::UpstreamRejected { .. } => "UPSTREAM_REJECTED",
            Self::MalformedUpstreamPayload(_) => "MALFORMED_UPSTREAM_PAYLOAD",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
