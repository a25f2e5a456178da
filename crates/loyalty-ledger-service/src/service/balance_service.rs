//! 余额与提现服务
//!
//! 余额 = 累计积分 - 已提现。提现流程：
//!
//! 1. 校验金额（> 0，最多两位小数）与抵扣订单号（Luhn）
//! 2. 开启事务，`SELECT ... FOR UPDATE` 锁定用户行，同一用户的提现串行执行
//! 3. 在事务内重新计算当前余额
//! 4. 余额不足则回滚并返回 `InsufficientFunds`
//! 5. 追加提现流水并提交
//!
//! 任一步骤失败时事务被回滚，不会出现部分扣减。

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use loyalty_shared::observability::metrics;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::error::{LedgerError, Result};
use crate::models::{Balance, has_money_scale};
use crate::repository::{BalanceRepository, BalanceRepositoryTrait};
use crate::service::dto::{BalanceDto, WithdrawalDto};
use crate::validator::is_valid_order_number;

/// 余额与提现服务
pub struct BalanceService {
    balance_repo: Arc<dyn BalanceRepositoryTrait>,
    pool: PgPool,
}

impl BalanceService {
    pub fn new(balance_repo: Arc<dyn BalanceRepositoryTrait>, pool: PgPool) -> Self {
        Self { balance_repo, pool }
    }

    /// 查询余额，两项汇总取自同一快照
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_balance(&self, user_id: i64) -> Result<BalanceDto> {
        let balance = self.balance_repo.get_balance(user_id).await?;
        Ok(BalanceDto::from(balance))
    }

    /// 提现
    #[instrument(skip(self), fields(user_id = %user_id, order_ref = %order_ref, amount = %amount))]
    pub async fn withdraw(
        &self,
        user_id: i64,
        order_ref: &str,
        amount: Decimal,
    ) -> Result<WithdrawalDto> {
        let start = Instant::now();
        let result = self.execute_withdraw(user_id, order_ref, amount).await;

        let status = match &result {
            Ok(_) => "success",
            Err(LedgerError::InsufficientFunds { .. }) => "insufficient_funds",
            Err(LedgerError::InvalidRequest(_)) => "invalid_request",
            Err(_) => "error",
        };
        metrics::record_withdrawal(status, start.elapsed().as_secs_f64());

        result
    }

    /// 查询提现流水，按处理时间正序；空列表表示尚无提现
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_withdrawals(&self, user_id: i64) -> Result<Vec<WithdrawalDto>> {
        let withdrawals = self.balance_repo.list_withdrawals(user_id).await?;
        Ok(withdrawals.into_iter().map(WithdrawalDto::from).collect())
    }

    // ==================== 私有方法 ====================

    async fn execute_withdraw(
        &self,
        user_id: i64,
        order_ref: &str,
        amount: Decimal,
    ) -> Result<WithdrawalDto> {
        validate_withdraw(order_ref, amount)?;

        let mut tx = self.pool.begin().await?;

        if !BalanceRepository::lock_user_in_tx(&mut tx, user_id).await? {
            return Err(LedgerError::UserNotFound(user_id));
        }

        let accrued = BalanceRepository::sum_accrual_in_tx(&mut tx, user_id).await?;
        let withdrawn = BalanceRepository::sum_withdrawn_in_tx(&mut tx, user_id).await?;
        let balance = Balance::new(accrued, withdrawn);

        if !balance.covers(amount) {
            warn!(available = %balance.current(), "积分不足，提现被拒绝");
            // tx 在此处 drop，自动回滚
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: balance.current(),
            });
        }

        let withdrawal = BalanceRepository::insert_withdrawal_in_tx(
            &mut tx,
            user_id,
            order_ref,
            amount,
            Utc::now(),
        )
        .await?;

        tx.commit().await?;

        info!(
            withdrawal_id = withdrawal.id,
            balance_after = %(balance.current() - amount),
            "提现成功"
        );

        Ok(WithdrawalDto::from(withdrawal))
    }
}

/// 校验提现参数
fn validate_withdraw(order_ref: &str, amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidRequest(format!(
            "提现金额必须大于 0: {amount}"
        )));
    }
    if !has_money_scale(amount) {
        return Err(LedgerError::InvalidRequest(format!(
            "提现金额最多两位小数: {amount}"
        )));
    }
    if !is_valid_order_number(order_ref) {
        return Err(LedgerError::InvalidRequest(format!(
            "抵扣订单号格式错误: {order_ref}"
        )));
    }
    Ok(())
}
