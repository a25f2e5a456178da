//! 领域模型
//!
//! 包含订单、提现流水、余额、金额转换以及相关枚举类型

mod enums;
mod money;
mod order;
mod withdrawal;

pub use enums::*;
pub use money::*;
pub use order::*;
pub use withdrawal::*;
