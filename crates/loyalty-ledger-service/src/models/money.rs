//! 金额转换
//!
//! 金额在库内与服务内统一使用 `Decimal`（两位小数），只在 JSON 边界以浮点数出现。

use std::str::FromStr;

use rust_decimal::Decimal;

/// 金额保留的小数位数
pub const MONEY_SCALE: u32 = 2;

/// 将 JSON 浮点数转换为 `Decimal`
///
/// 经由最短十进制表示转换，`0.1` 得到精确的 `0.1`；非有限值返回 `None`
pub fn decimal_from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&value.to_string()).ok()
}

/// 金额是否最多两位小数
pub fn has_money_scale(amount: Decimal) -> bool {
    amount.normalize().scale() <= MONEY_SCALE
}
