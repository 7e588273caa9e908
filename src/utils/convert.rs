use crate::errors::error::AppError;
use bigdecimal::BigDecimal;
use bigdecimal::num_bigint::BigInt;
use ethers_core::types::U256;

/// 10^decimals
pub fn pow10(decimals: u8) -> BigDecimal {
    BigDecimal::new(BigInt::from(1), -(decimals as i64))
}

/// 整数 BigDecimal 转 U256（负数、小数、溢出都视为错误）
pub fn bigdecimal_to_u256(value: &BigDecimal) -> Result<U256, AppError> {
    if value < &BigDecimal::from(0) {
        return Err(AppError::InvalidNumeric(format!("{} 不能为负数", value)));
    }
    if !value.is_integer() {
        return Err(AppError::InvalidNumeric(format!(
            "{} 超出合约精度（缩放后仍有小数）",
            value
        )));
    }
    let digits = value.with_scale(0).to_string();
    U256::from_dec_str(&digits)
        .map_err(|e| AppError::InvalidNumeric(format!("{} 超出 uint256 范围: {}", digits, e)))
}

/// U256 转 u64，超出范围时报错
pub fn u256_to_u64(value: U256) -> Result<u64, AppError> {
    if value > U256::from(u64::MAX) {
        return Err(AppError::InvalidNumeric(format!(
            "U256({}) 超出u64范围",
            value
        )));
    }
    Ok(value.as_u64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn pow10_scales() {
        let scaled = BigDecimal::from_str("1.5").unwrap() * pow10(6);
        assert_eq!(bigdecimal_to_u256(&scaled).unwrap(), U256::from(1_500_000u64));
    }

    #[test]
    fn rejects_fraction_and_negative() {
        let too_precise = BigDecimal::from_str("0.0000001").unwrap() * pow10(6);
        assert!(bigdecimal_to_u256(&too_precise).is_err());
        assert!(bigdecimal_to_u256(&BigDecimal::from(-1)).is_err());
    }

    #[test]
    fn u64_overflow() {
        assert_eq!(u256_to_u64(U256::from(21_000u64)).unwrap(), 21_000);
        assert!(u256_to_u64(U256::MAX).is_err());
    }
}
