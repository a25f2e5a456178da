//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::{Balance, Order, OrderStatus, Withdrawal};

/// 订单仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepositoryTrait: Send + Sync {
    // 受理
    async fn insert_order(
        &self,
        user_id: i64,
        number: &str,
        uploaded_at: DateTime<Utc>,
    ) -> Result<Order>;
    async fn order_exists(&self, user_id: i64, number: &str) -> Result<bool>;
    async fn order_exists_globally(&self, number: &str) -> Result<bool>;
    async fn list_orders_by_user(&self, user_id: i64) -> Result<Vec<Order>>;

    // 对账
    async fn select_next_unresolved_order(&self, lease: Duration) -> Result<Option<Order>>;
    async fn defer_order(&self, number: &str, delay: Duration) -> Result<()>;
    async fn update_order_resolution(
        &self,
        number: &str,
        status: OrderStatus,
        accrual: Option<Decimal>,
    ) -> Result<bool>;
}

/// 余额仓储接口
///
/// 提现写入只在事务内进行，见 `BalanceRepository::insert_withdrawal_in_tx`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BalanceRepositoryTrait: Send + Sync {
    async fn sum_accrual(&self, user_id: i64) -> Result<Decimal>;
    async fn sum_withdrawn(&self, user_id: i64) -> Result<Decimal>;
    async fn get_balance(&self, user_id: i64) -> Result<Balance>;
    async fn list_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>>;
}
