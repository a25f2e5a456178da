//! 业务服务层
//!
//! 实现订单受理与余额/提现逻辑，协调仓储层完成数据操作。
//!
//! ## 服务列表
//!
//! - `OrderService`: 订单受理与查询
//! - `BalanceService`: 余额查询、提现与提现流水
//!
//! ## 设计原则
//!
//! - 服务层负责业务规则校验和事务控制
//! - 认证后的用户 ID 作为显式参数传入，服务不读取请求上下文
//! - 服务不缓存余额或订单状态，每次调用都以数据库为准

mod balance_service;
pub mod dto;
mod order_service;

pub use balance_service::BalanceService;
pub use order_service::OrderService;
