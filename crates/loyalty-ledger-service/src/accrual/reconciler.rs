//! 积分对账 Worker
//!
//! 每轮循环：
//! 1. 认领一笔未完结订单（租约 + `FOR UPDATE SKIP LOCKED`），没有则等待下一轮
//! 2. 向积分计算系统查询该订单
//! 3. 映射状态并回写：REGISTERED/PROCESSING -> PROCESSING，INVALID -> INVALID（积分 0），
//!    PROCESSED -> PROCESSED（积分缺省为 0）
//! 4. 任何失败只记录日志，订单状态与积分保持不变，稍后重试
//!
//! 认领租约长于请求超时，同一笔订单任意时刻最多只有一个在途请求。
//! 收到 429 时，本进程内所有 Worker 一起暂停到 `Retry-After` 之后。

use std::sync::Arc;
use std::time::{Duration, Instant};

use loyalty_shared::config::AccrualConfig;
use loyalty_shared::error::SharedError;
use loyalty_shared::observability::metrics;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::client::{AccrualResponse, ScoringClient};
use crate::error::{LedgerError, Result};
use crate::models::{AccrualStatus, MONEY_SCALE, OrderStatus, decimal_from_f64};
use crate::repository::OrderRepositoryTrait;

/// 对账 Worker 配置
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// 空闲或失败后的等待间隔
    pub poll_interval: Duration,
    /// 认领租约
    pub claim_lease: Duration,
    /// 并发 Worker 数量
    pub workers: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            claim_lease: Duration::from_secs(30),
            workers: 1,
        }
    }
}

impl TryFrom<&AccrualConfig> for ReconcilerConfig {
    type Error = SharedError;

    /// 租约不长于请求超时的配置会被拒绝
    fn try_from(config: &AccrualConfig) -> std::result::Result<Self, Self::Error> {
        config.validate()?;
        Ok(Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            claim_lease: Duration::from_secs(config.claim_lease_secs),
            workers: config.workers.max(1),
        })
    }
}

/// 单轮对账结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// 没有待对账订单
    Idle,
    /// 已写入终态
    Resolved(OrderStatus),
    /// 积分计算系统仍在处理，已推迟下一次认领
    Pending,
    /// 订单已被其他途径置为终态，未写入
    Skipped,
    /// 被限流，暂停指定时长
    Paused(Duration),
    /// 上游失败或响应异常，订单保持原状
    Failed,
}

impl CycleOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Resolved(OrderStatus::Invalid) => "invalid",
            Self::Resolved(_) => "processed",
            Self::Pending => "pending",
            Self::Skipped => "skipped",
            Self::Paused(_) => "rate_limited",
            Self::Failed => "failed",
        }
    }
}

/// 积分对账 Worker
pub struct Reconciler {
    order_repo: Arc<dyn OrderRepositoryTrait>,
    client: Arc<dyn ScoringClient>,
    config: ReconcilerConfig,
    /// 限流暂停截止时间，所有 Worker 共享
    paused_until: Mutex<Option<Instant>>,
}

impl Reconciler {
    pub fn new(
        order_repo: Arc<dyn OrderRepositoryTrait>,
        client: Arc<dyn ScoringClient>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            order_repo,
            client,
            config,
            paused_until: Mutex::new(None),
        }
    }

    /// 按配置数量启动 Worker
    ///
    /// 关闭信号变为 `true` 后各 Worker 在当前轮结束时退出
    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        (0..self.config.workers.max(1))
            .map(|worker_id| {
                let this = Arc::clone(&self);
                let shutdown = shutdown.clone();
                tokio::spawn(async move { this.run(worker_id, shutdown).await })
            })
            .collect()
    }

    /// 主循环：持续对账直到收到关闭信号
    pub async fn run(&self, worker_id: usize, mut shutdown: watch::Receiver<bool>) {
        info!(
            worker_id,
            poll_interval = ?self.config.poll_interval,
            claim_lease = ?self.config.claim_lease,
            "对账 Worker 已启动"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let delay = match self.reconcile_once().await {
                Ok(CycleOutcome::Idle) | Ok(CycleOutcome::Failed) => self.config.poll_interval,
                Ok(CycleOutcome::Paused(remaining)) => remaining,
                Ok(_) => Duration::ZERO,
                Err(e) => {
                    error!(worker_id, error = %e, "对账出错");
                    self.config.poll_interval
                }
            };

            if delay.is_zero() {
                continue;
            }

            tokio::select! {
                // 偏向关闭信号，保证收到关闭时能尽快退出
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!(worker_id, "收到关闭信号，对账 Worker 退出");
    }

    /// 执行一轮对账
    ///
    /// 上游失败在内部吸收并体现在返回值中，只有存储错误以 `Err` 返回
    pub async fn reconcile_once(&self) -> Result<CycleOutcome> {
        if let Some(remaining) = self.pause_remaining() {
            return Ok(CycleOutcome::Paused(remaining));
        }

        let Some(order) = self
            .order_repo
            .select_next_unresolved_order(self.config.claim_lease)
            .await?
        else {
            return Ok(CycleOutcome::Idle);
        };

        let start = Instant::now();
        let outcome = self.resolve_order(&order.number).await;

        let label = match &outcome {
            Ok(o) => o.label(),
            Err(_) => "storage_error",
        };
        metrics::record_reconciliation(label, start.elapsed().as_secs_f64());

        outcome
    }

    // ==================== 私有方法 ====================

    async fn resolve_order(&self, number: &str) -> Result<CycleOutcome> {
        let response = match self.client.resolve(number).await {
            Ok(response) => response,
            Err(LedgerError::UpstreamRateLimited { retry_after }) => {
                warn!(order_number = %number, ?retry_after, "积分计算系统限流，暂停对账");
                self.pause_for(retry_after);
                metrics::record_rate_limited(retry_after.as_secs());
                self.order_repo.defer_order(number, retry_after).await?;
                return Ok(CycleOutcome::Paused(retry_after));
            }
            Err(e) => {
                warn!(order_number = %number, error = %e, "查询积分计算系统失败，稍后重试");
                self.order_repo
                    .defer_order(number, self.config.poll_interval)
                    .await?;
                return Ok(CycleOutcome::Failed);
            }
        };

        let (status, accrual) = match interpret_response(number, &response) {
            Ok(resolution) => resolution,
            Err(e) => {
                warn!(order_number = %number, error = %e, "积分计算系统响应异常，稍后重试");
                self.order_repo
                    .defer_order(number, self.config.poll_interval)
                    .await?;
                return Ok(CycleOutcome::Failed);
            }
        };

        let written = self
            .order_repo
            .update_order_resolution(number, status, accrual)
            .await?;

        if !written {
            debug!(order_number = %number, "订单已是终态，跳过回写");
            return Ok(CycleOutcome::Skipped);
        }

        if status.is_terminal() {
            info!(
                order_number = %number,
                status = %status,
                accrual = ?accrual,
                "订单对账完成"
            );
            Ok(CycleOutcome::Resolved(status))
        } else {
            self.order_repo
                .defer_order(number, self.config.poll_interval)
                .await?;
            Ok(CycleOutcome::Pending)
        }
    }

    fn pause_for(&self, duration: Duration) {
        let until = Instant::now() + duration;
        let mut paused = self.paused_until.lock();
        if paused.is_none_or(|current| current < until) {
            *paused = Some(until);
        }
    }

    fn pause_remaining(&self) -> Option<Duration> {
        let mut paused = self.paused_until.lock();
        let remaining = paused.and_then(|until| until.checked_duration_since(Instant::now()));
        if remaining.is_none() {
            *paused = None;
        }
        remaining.filter(|d| !d.is_zero())
    }
}

/// 将积分计算系统答复映射为本地状态与积分
///
/// 订单号不一致或积分为负视为响应异常
fn interpret_response(
    number: &str,
    response: &AccrualResponse,
) -> Result<(OrderStatus, Option<Decimal>)> {
    if response.order != number {
        return Err(LedgerError::MalformedUpstreamPayload(format!(
            "订单号不一致: 请求 {number}, 返回 {}",
            response.order
        )));
    }

    let accrual = match response.accrual {
        Some(value) => {
            let amount = decimal_from_f64(value).ok_or_else(|| {
                LedgerError::MalformedUpstreamPayload(format!("无效的积分: {value}"))
            })?;
            if amount < Decimal::ZERO {
                return Err(LedgerError::MalformedUpstreamPayload(format!(
                    "积分不能为负: {value}"
                )));
            }
            Some(amount.round_dp(MONEY_SCALE))
        }
        None => None,
    };

    let status = response.status.to_order_status();
    let accrual = match response.status {
        AccrualStatus::Registered | AccrualStatus::Processing => None,
        AccrualStatus::Invalid => Some(Decimal::ZERO),
        AccrualStatus::Processed => Some(accrual.unwrap_or(Decimal::ZERO)),
    };

    Ok((status, accrual))
}
