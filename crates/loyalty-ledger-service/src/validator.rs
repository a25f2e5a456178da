//! 订单号校验
//!
//! 订单号为十进制数字串，使用 Luhn（mod 10）校验位。

/// 校验订单号
///
/// 仅接受 ASCII 数字，长度至少 2 位，且 Luhn 校验和为 10 的倍数
pub fn is_valid_order_number(number: &str) -> bool {
    if number.len() < 2 || !number.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let sum: u32 = number
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let digit = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = digit * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                digit
            }
        })
        .sum();

    sum % 10 == 0
}
