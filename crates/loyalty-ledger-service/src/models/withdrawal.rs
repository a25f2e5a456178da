//! 提现流水与余额

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 提现流水
///
/// 只追加，不修改不删除
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Withdrawal {
    pub id: i64,
    pub user_id: i64,
    /// 抵扣的订单号（客户端提供，不校验归属）
    pub order_number: String,
    pub amount: Decimal,
    pub processed_at: DateTime<Utc>,
}

/// 用户余额快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Balance {
    /// 累计积分
    pub accrued: Decimal,
    /// 已提现
    pub withdrawn: Decimal,
}

impl Balance {
    pub fn new(accrued: Decimal, withdrawn: Decimal) -> Self {
        Self { accrued, withdrawn }
    }

    /// 当前可用余额
    pub fn current(&self) -> Decimal {
        self.accrued - self.withdrawn
    }

    /// 是否足以支付指定金额
    pub fn covers(&self, amount: Decimal) -> bool {
        self.current() >= amount
    }
}
