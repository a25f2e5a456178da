//! 服务层数据传输对象
//!
//! 定义服务层与外部交互使用的 DTO，与内部领域模型解耦。
//! 金额在 JSON 中以浮点数表示。

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Balance, Order, OrderStatus, Withdrawal};

/// 订单提交结果
///
/// 格式错误与订单号冲突以错误形式返回
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// 新订单已受理
    Accepted,
    /// 该用户此前已提交过同一订单号
    AlreadyAccepted,
}

/// 订单 DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDto {
    pub number: String,
    pub status: OrderStatus,
    /// 仅 PROCESSED 订单携带积分
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub accrual: Option<Decimal>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Order> for OrderDto {
    fn from(order: Order) -> Self {
        let accrual = match order.status {
            OrderStatus::Processed => Some(order.effective_accrual()),
            _ => None,
        };
        Self {
            number: order.number,
            status: order.status,
            accrual,
            uploaded_at: order.uploaded_at,
        }
    }
}

/// 余额 DTO
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceDto {
    #[serde(with = "rust_decimal::serde::float")]
    pub current: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub withdrawn: Decimal,
}

impl From<Balance> for BalanceDto {
    fn from(balance: Balance) -> Self {
        Self {
            current: balance.current(),
            withdrawn: balance.withdrawn,
        }
    }
}

/// 提现流水 DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalDto {
    /// 抵扣的订单号
    pub order: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub sum: Decimal,
    pub processed_at: DateTime<Utc>,
}

impl From<Withdrawal> for WithdrawalDto {
    fn from(w: Withdrawal) -> Self {
        Self {
            order: w.order_number,
            sum: w.amount,
            processed_at: w.processed_at,
        }
    }
}
