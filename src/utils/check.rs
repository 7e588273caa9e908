use ethers_core::types::Address;

/// 是否为零地址（无法解析时返回 false，由编码器报告格式错误）
pub fn is_zero_address(value: &str) -> bool {
    value
        .trim()
        .parse::<Address>()
        .map(|a| a == Address::zero())
        .unwrap_or(false)
}

/// 去掉 0x 前缀后是否为合法十六进制
pub fn is_hex_string(value: &str) -> bool {
    let body = value.strip_prefix("0x").unwrap_or(value);
    !body.is_empty() && body.chars().all(|c| c.is_ascii_hexdigit())
}
