//! 余额仓储
//!
//! 提供积分汇总、提现流水的数据访问。提现相关的写操作只以事务内函数的形式提供，
//! 由 `BalanceService::withdraw` 在持有用户行锁的事务中调用。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Row};

use super::traits::BalanceRepositoryTrait;
use crate::error::Result;
use crate::models::{Balance, Withdrawal};

/// 余额仓储
pub struct BalanceRepository {
    pool: PgPool,
}

impl BalanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 汇总 ====================

    /// 用户累计积分，无订单时为 0
    pub async fn sum_accrual(&self, user_id: i64) -> Result<Decimal> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(accrual), 0) AS total FROM orders WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("total"))
    }

    /// 用户累计提现，无流水时为 0
    pub async fn sum_withdrawn(&self, user_id: i64) -> Result<Decimal> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(amount), 0) AS total FROM withdrawals WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("total"))
    }

    /// 在同一条语句中读取两项汇总，保证是同一快照
    pub async fn get_balance(&self, user_id: i64) -> Result<Balance> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE((SELECT SUM(accrual) FROM orders WHERE user_id = $1), 0) AS accrued,
                COALESCE((SELECT SUM(amount) FROM withdrawals WHERE user_id = $1), 0) AS withdrawn
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Balance::new(row.get("accrued"), row.get("withdrawn")))
    }

    /// 列出用户提现流水，按处理时间正序
    pub async fn list_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>> {
        let withdrawals = sqlx::query_as::<_, Withdrawal>(
            r#"
            SELECT id, user_id, order_number, amount, processed_at
            FROM withdrawals
            WHERE user_id = $1
            ORDER BY processed_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(withdrawals)
    }

    // ==================== 事务内操作 ====================

    /// 锁定用户行（SELECT ... FOR UPDATE）
    ///
    /// 同一用户的提现在此串行化，返回用户是否存在
    pub async fn lock_user_in_tx(tx: &mut PgConnection, user_id: i64) -> Result<bool> {
        let row = sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(tx)
            .await?;

        Ok(row.is_some())
    }

    /// 在事务中读取累计积分
    pub async fn sum_accrual_in_tx(tx: &mut PgConnection, user_id: i64) -> Result<Decimal> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(accrual), 0) AS total FROM orders WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(tx)
        .await?;

        Ok(row.get("total"))
    }

    /// 在事务中读取累计提现
    pub async fn sum_withdrawn_in_tx(tx: &mut PgConnection, user_id: i64) -> Result<Decimal> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(amount), 0) AS total FROM withdrawals WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(tx)
        .await?;

        Ok(row.get("total"))
    }

    /// 在事务中追加提现流水
    pub async fn insert_withdrawal_in_tx(
        tx: &mut PgConnection,
        user_id: i64,
        order_number: &str,
        amount: Decimal,
        processed_at: DateTime<Utc>,
    ) -> Result<Withdrawal> {
        let withdrawal = sqlx::query_as::<_, Withdrawal>(
            r#"
            INSERT INTO withdrawals (user_id, order_number, amount, processed_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, order_number, amount, processed_at
            "#,
        )
        .bind(user_id)
        .bind(order_number)
        .bind(amount)
        .bind(processed_at)
        .fetch_one(tx)
        .await?;

        Ok(withdrawal)
    }
}

#[async_trait]
impl BalanceRepositoryTrait for BalanceRepository {
    async fn sum_accrual(&self, user_id: i64) -> Result<Decimal> {
        self.sum_accrual(user_id).await
    }

    async fn sum_withdrawn(&self, user_id: i64) -> Result<Decimal> {
        self.sum_withdrawn(user_id).await
    }

    async fn get_balance(&self, user_id: i64) -> Result<Balance> {
        self.get_balance(user_id).await
    }

    async fn list_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>> {
        self.list_withdrawals(user_id).await
    }
}
