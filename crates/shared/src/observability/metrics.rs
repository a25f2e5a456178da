//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    server_handle: tokio::task::JoinHandle<()>,
}

impl MetricsHandle {
    /// 停止指标服务器
    pub fn shutdown(self) {
        self.server_handle.abort();
    }
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle { server_handle })
}

/// 注册通用指标描述
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "order_submissions_total",
        "Total number of order submissions by outcome"
    );

    metrics::describe_counter!("withdrawals_total", "Total number of withdrawal attempts");
    metrics::describe_histogram!(
        "withdrawal_duration_seconds",
        "Withdrawal duration in seconds"
    );

    metrics::describe_counter!(
        "accrual_reconciliations_total",
        "Total number of accrual reconciliation attempts"
    );
    metrics::describe_histogram!(
        "accrual_reconciliation_duration_seconds",
        "Accrual reconciliation duration in seconds"
    );
    metrics::describe_counter!(
        "accrual_rate_limited_total",
        "Total number of rate limit responses from the accrual system"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录订单提交结果（accepted / already_accepted / conflict / invalid）
#[inline]
pub fn record_order_submission(outcome: &str) {
    metrics::counter!(
        "order_submissions_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// 记录提现
#[inline]
pub fn record_withdrawal(status: &str, duration_secs: f64) {
    metrics::counter!(
        "withdrawals_total",
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!("withdrawal_duration_seconds").record(duration_secs);
}

/// 记录一次对账尝试
#[inline]
pub fn record_reconciliation(outcome: &str, duration_secs: f64) {
    metrics::counter!(
        "accrual_reconciliations_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "accrual_reconciliation_duration_seconds",
        "outcome" => outcome.to_string()
    )
    .record(duration_secs);
}

/// 记录上游限流
#[inline]
pub fn record_rate_limited(retry_after_secs: u64) {
    metrics::counter!("accrual_rate_limited_total").increment(1);
    metrics::gauge!("accrual_retry_after_seconds").set(retry_after_secs as f64);
}
