//! 数据库仓储层
//!
//! 提供订单与提现流水的数据访问接口，封装 SQL 操作细节。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - 使用 SQLx 进行类型安全的数据库操作
//! - 事务控制由调用方（服务层）决定，事务内操作以 `*_in_tx` 关联函数提供
//! - 定义 trait 接口以支持 mock 测试

mod balance_repo;
mod order_repo;
mod traits;

pub use balance_repo::BalanceRepository;
pub use order_repo::OrderRepository;
pub use traits::*;
