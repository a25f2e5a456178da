//! 积分计算系统对接
//!
//! - `client`: 积分计算系统 HTTP 客户端，负责状态码与响应体映射
//! - `reconciler`: 后台对账 Worker，轮询未完结订单并回写结果

mod client;
mod reconciler;

pub use client::{AccrualResponse, HttpScoringClient, ScoringClient};
pub use reconciler::{CycleOutcome, Reconciler, ReconcilerConfig};

#[cfg(test)]
pub use client::MockScoringClient;
