//! 订单仓储
//!
//! 订单受理与对账所需的数据访问

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::traits::OrderRepositoryTrait;
use crate::error::{LedgerError, Result};
use crate::models::{Order, OrderStatus};

/// 订单仓储
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 受理 ====================

    /// 插入新订单（状态 NEW，积分为空）
    ///
    /// 订单号全局唯一由数据库约束保证，冲突时返回 `DuplicateOrder`
    pub async fn insert_order(
        &self,
        user_id: i64,
        number: &str,
        uploaded_at: DateTime<Utc>,
    ) -> Result<Order> {
        sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (number, user_id, status, uploaded_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, number, user_id, status, accrual, uploaded_at, updated_at
            "#,
        )
        .bind(number)
        .bind(user_id)
        .bind(OrderStatus::New)
        .bind(uploaded_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                LedgerError::DuplicateOrder(number.to_string())
            }
            other => LedgerError::Database(other),
        })
    }

    /// 该用户是否已提交过此订单号
    pub async fn order_exists(&self, user_id: i64, number: &str) -> Result<bool> {
        let exists: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(SELECT 1 FROM orders WHERE user_id = $1 AND number = $2)
            "#,
        )
        .bind(user_id)
        .bind(number)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists.0)
    }

    /// 是否有任意用户提交过此订单号
    pub async fn order_exists_globally(&self, number: &str) -> Result<bool> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM orders WHERE number = $1)")
                .bind(number)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists.0)
    }

    /// 列出用户订单，按上传时间正序
    pub async fn list_orders_by_user(&self, user_id: i64) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, number, user_id, status, accrual, uploaded_at, updated_at
            FROM orders
            WHERE user_id = $1
            ORDER BY uploaded_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    // ==================== 对账 ====================

    /// 认领一笔未完结订单
    ///
    /// 只挑选租约已过期的订单，并在同一语句内写入新租约；
    /// `SKIP LOCKED` 保证多个 Worker 并发认领时互不阻塞、不会拿到同一笔。
    /// 认领不修改状态与积分。
    pub async fn select_next_unresolved_order(&self, lease: Duration) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET claimed_until = NOW() + make_interval(secs => $1)
            WHERE id = (
                SELECT id FROM orders
                WHERE status NOT IN ('PROCESSED', 'INVALID')
                  AND (claimed_until IS NULL OR claimed_until <= NOW())
                ORDER BY claimed_until NULLS FIRST, uploaded_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, number, user_id, status, accrual, uploaded_at, updated_at
            "#,
        )
        .bind(lease.as_secs_f64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// 推迟订单的下一次认领时间，不改变状态
    pub async fn defer_order(&self, number: &str, delay: Duration) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET claimed_until = NOW() + make_interval(secs => $2)
            WHERE number = $1 AND status NOT IN ('PROCESSED', 'INVALID')
            "#,
        )
        .bind(number)
        .bind(delay.as_secs_f64())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 回写对账结果
    ///
    /// 只更新非终态订单，终态订单不会被回退或改写。写入终态时释放租约。
    /// 返回是否有记录被更新。
    pub async fn update_order_resolution(
        &self,
        number: &str,
        status: OrderStatus,
        accrual: Option<Decimal>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2,
                accrual = $3,
                updated_at = NOW(),
                claimed_until = CASE WHEN $4 THEN NULL ELSE claimed_until END
            WHERE number = $1 AND status NOT IN ('PROCESSED', 'INVALID')
            "#,
        )
        .bind(number)
        .bind(status)
        .bind(accrual)
        .bind(status.is_terminal())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl OrderRepositoryTrait for OrderRepository {
    async fn insert_order(
        &self,
        user_id: i64,
        number: &str,
        uploaded_at: DateTime<Utc>,
    ) -> Result<Order> {
        self.insert_order(user_id, number, uploaded_at).await
    }

    async fn order_exists(&self, user_id: i64, number: &str) -> Result<bool> {
        self.order_exists(user_id, number).await
    }

    async fn order_exists_globally(&self, number: &str) -> Result<bool> {
        self.order_exists_globally(number).await
    }

    async fn list_orders_by_user(&self, user_id: i64) -> Result<Vec<Order>> {
        self.list_orders_by_user(user_id).await
    }

    async fn select_next_unresolved_order(&self, lease: Duration) -> Result<Option<Order>> {
        self.select_next_unresolved_order(lease).await
    }

    async fn defer_order(&self, number: &str, delay: Duration) -> Result<()> {
        self.defer_order(number, delay).await
    }

    async fn update_order_resolution(
        &self,
        number: &str,
        status: OrderStatus,
        accrual: Option<Decimal>,
    ) -> Result<bool> {
        self.update_order_resolution(number, status, accrual).await
    }
}
