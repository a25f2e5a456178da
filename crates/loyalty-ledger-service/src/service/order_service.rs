//! 订单受理服务
//!
//! 校验订单号并保证订单号与用户的一对一归属：
//! 同一用户重复提交幂等，其他用户提交同一订单号返回冲突。

use std::sync::Arc;

use chrono::Utc;
use loyalty_shared::observability::metrics;
use tracing::{info, instrument, warn};

use crate::error::{LedgerError, Result};
use crate::repository::OrderRepositoryTrait;
use crate::service::dto::{OrderDto, SubmitOutcome};
use crate::validator::is_valid_order_number;

/// 订单受理服务
pub struct OrderService {
    order_repo: Arc<dyn OrderRepositoryTrait>,
}

impl OrderService {
    pub fn new(order_repo: Arc<dyn OrderRepositoryTrait>) -> Self {
        Self { order_repo }
    }

    /// 提交订单号
    ///
    /// 1. 去除首尾空白后做 Luhn 校验
    /// 2. 本人已提交 -> `AlreadyAccepted`
    /// 3. 他人已提交 -> `OrderNumberConflict`
    /// 4. 插入 NEW 订单 -> `Accepted`
    ///
    /// 2、3 两步只是快速路径，真正的唯一性由数据库约束保证：
    /// 插入撞上唯一约束时重新判断归属。
    #[instrument(skip(self, raw_number), fields(user_id = %user_id))]
    pub async fn submit_order(&self, user_id: i64, raw_number: &str) -> Result<SubmitOutcome> {
        let number = raw_number.trim();
        let outcome = self.submit_validated(user_id, number).await;

        metrics::record_order_submission(match &outcome {
            Ok(SubmitOutcome::Accepted) => "accepted",
            Ok(SubmitOutcome::AlreadyAccepted) => "already_accepted",
            Err(LedgerError::InvalidFormat(_)) => "invalid_format",
            Err(LedgerError::OrderNumberConflict(_)) => "conflict",
            Err(_) => "error",
        });

        outcome
    }

    /// 查询用户订单，按上传时间正序；空列表表示尚无订单
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_orders(&self, user_id: i64) -> Result<Vec<OrderDto>> {
        let orders = self.order_repo.list_orders_by_user(user_id).await?;
        Ok(orders.into_iter().map(OrderDto::from).collect())
    }

    // ==================== 私有方法 ====================

    async fn submit_validated(&self, user_id: i64, number: &str) -> Result<SubmitOutcome> {
        if !is_valid_order_number(number) {
            return Err(LedgerError::InvalidFormat(number.to_string()));
        }

        if self.order_repo.order_exists(user_id, number).await? {
            return Ok(SubmitOutcome::AlreadyAccepted);
        }

        if self.order_repo.order_exists_globally(number).await? {
            return Err(LedgerError::OrderNumberConflict(number.to_string()));
        }

        match self
            .order_repo
            .insert_order(user_id, number, Utc::now())
            .await
        {
            Ok(order) => {
                info!(order_number = %order.number, "订单已受理");
                Ok(SubmitOutcome::Accepted)
            }
            Err(LedgerError::DuplicateOrder(_)) => {
                warn!(order_number = %number, "并发提交同一订单号，重新判断归属");
                self.resolve_duplicate(user_id, number).await
            }
            Err(e) => Err(e),
        }
    }

    /// 插入冲突后判断订单号归属
    async fn resolve_duplicate(&self, user_id: i64, number: &str) -> Result<SubmitOutcome> {
        if self.order_repo.order_exists(user_id, number).await? {
            Ok(SubmitOutcome::AlreadyAccepted)
        } else {
            Err(LedgerError::OrderNumberConflict(number.to_string()))
        }
    }
}
