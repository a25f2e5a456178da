//! 积分账本服务
//!
//! 用户上传订单号，外部积分计算系统（accrual）异步给出每笔订单的积分，
//! 用户可以用累计积分抵扣后续订单。
//!
//! ## 核心功能
//!
//! - **订单受理**：校验订单号（Luhn），保证订单号全局唯一归属
//! - **余额与提现**：余额 = 累计积分 - 已提现，并发提现不会透支
//! - **积分对账**：后台 Worker 轮询未完结订单，向积分计算系统查询并幂等回写
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `validator`: 订单号校验
//! - `repository`: 数据库仓储层
//! - `service`: 业务服务层
//! - `accrual`: 积分计算系统客户端与对账 Worker

pub mod accrual;
pub mod error;
pub mod models;
pub mod repository;
pub mod service;
pub mod validator;

pub use accrual::{AccrualResponse, HttpScoringClient, Reconciler, ReconcilerConfig, ScoringClient};
pub use error::{LedgerError, Result};
pub use models::*;
pub use repository::{BalanceRepository, OrderRepository};
pub use service::{BalanceService, OrderService, dto};
