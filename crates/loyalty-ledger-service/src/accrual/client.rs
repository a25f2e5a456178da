//! 积分计算系统客户端
//!
//! 通过 ScoringClient trait 抽象 HTTP 调用，便于测试时注入 mock 实现。
//!
//! 状态码映射：
//! - `200`：解析响应体，无法解析视为 `MalformedUpstreamPayload`
//! - `429`：`UpstreamRateLimited`，等待时长取自 `Retry-After`
//! - `500`、网络错误、超时：`UpstreamUnavailable`
//! - 其他状态码：`UpstreamRejected`

use std::time::Duration;

use async_trait::async_trait;
use loyalty_shared::config::AccrualConfig;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{LedgerError, Result};
use crate::models::AccrualStatus;

/// 积分计算系统对单笔订单的答复
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualResponse {
    pub order: String,
    pub status: AccrualStatus,
    /// 仅 PROCESSED 时存在
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<f64>,
}

/// 积分计算系统的抽象接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScoringClient: Send + Sync {
    /// 查询订单的积分计算结果
    async fn resolve(&self, order_number: &str) -> Result<AccrualResponse>;
}

/// 基于 reqwest 的积分计算系统客户端
///
/// `reqwest::Client` 内部带连接池，整个进程复用同一个实例
pub struct HttpScoringClient {
    client: reqwest::Client,
    base_url: String,
    default_retry_after: Duration,
}

impl HttpScoringClient {
    /// 创建客户端
    ///
    /// `base_url` 缺少协议时按 `http://` 处理
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        default_retry_after: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| LedgerError::Internal(format!("创建 HTTP 客户端失败: {e}")))?;

        let base_url = normalize_base_url(base_url);
        info!(base_url = %base_url, ?request_timeout, "积分计算系统客户端已初始化");

        Ok(Self {
            client,
            base_url,
            default_retry_after,
        })
    }

    /// 基于配置创建客户端
    pub fn from_config(config: &AccrualConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            Duration::from_millis(config.request_timeout_ms),
            Duration::from_secs(config.default_retry_after_secs),
        )
    }

    fn order_url(&self, order_number: &str) -> String {
        format!("{}/api/orders/{}", self.base_url, order_number)
    }
}

#[async_trait]
impl ScoringClient for HttpScoringClient {
    async fn resolve(&self, order_number: &str) -> Result<AccrualResponse> {
        let url = self.order_url(order_number);
        debug!(url = %url, "查询积分计算系统");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LedgerError::UpstreamUnavailable(format!("请求失败: {e}")))?;

        match response.status() {
            StatusCode::OK => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| LedgerError::UpstreamUnavailable(format!("读取响应失败: {e}")))?;
                serde_json::from_slice::<AccrualResponse>(&body)
                    .map_err(|e| LedgerError::MalformedUpstreamPayload(e.to_string()))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after =
                    parse_retry_after(response.headers()).unwrap_or(self.default_retry_after);
                Err(LedgerError::UpstreamRateLimited { retry_after })
            }
            StatusCode::INTERNAL_SERVER_ERROR => Err(LedgerError::UpstreamUnavailable(
                "积分计算系统内部错误 (500)".to_string(),
            )),
            other => Err(LedgerError::UpstreamRejected {
                status: other.as_u16(),
            }),
        }
    }
}

/// 解析 `Retry-After`，只支持秒数形式
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}
