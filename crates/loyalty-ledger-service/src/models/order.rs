//! 订单实体

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::OrderStatus;

/// 订单
///
/// 订单号全局唯一，一旦提交就永久归属于提交者
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    /// 订单号（Luhn 校验通过的数字串）
    pub number: String,
    /// 所属用户
    pub user_id: i64,
    pub status: OrderStatus,
    /// 积分，终态前为空
    #[sqlx(default)]
    pub accrual: Option<Decimal>,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// 对余额生效的积分
    pub fn effective_accrual(&self) -> Decimal {
        self.accrual.unwrap_or(Decimal::ZERO)
    }
}
