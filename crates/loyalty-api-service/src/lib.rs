//! 积分账本 HTTP 服务
//!
//! 对外提供用户注册登录、订单上传、余额查询与提现接口，
//! 并在同一进程内运行积分对账 Worker。
//!
//! ## 模块结构
//!
//! - `auth`: JWT、密码哈希与用户仓储
//! - `cli`: 命令行参数
//! - `middleware`: 认证中间件
//! - `handlers`: HTTP 请求处理器
//! - `routes`: 路由配置
//! - `dto`: 请求与响应结构
//! - `error`: 错误到 HTTP 响应的映射
//! - `state`: 应用状态

pub mod auth;
pub mod cli;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ApiError, Result};
pub use routes::app;
pub use state::AppState;
