use ethers_core::types::U256;
use ethers_core::utils::format_units;
use num_format::{Locale, ToFormattedString};

/// 按精度格式化整数金额，去掉多余的尾随零
/// 例如 1500000 / 10^6 => "1.5"
pub fn format_units_trimmed(value: U256, decimals: u8) -> String {
    match format_units(value, decimals as u32) {
        Ok(formatted) => formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string(),
        Err(_) => value.to_string(),
    }
}

/// 千分位格式化 gas，日志输出用
pub fn format_gas(gas: u64) -> String {
    gas.to_formatted_string(&Locale::en)
}
