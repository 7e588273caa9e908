//! ABI 编解码：类型化参数 -> call data，原始返回字节 -> 类型化值
//!
//! 只支持定长标量：address、uint8..uint256、bool、bytes32。
//! 金额参数（`FunctionParam::scaled`）按合约精度缩放后再转换为整数。
use crate::errors::error::AppError;
use crate::log_debug;
use crate::models::domain::contract::{FunctionParam, FunctionSignature};
use crate::models::domain::request::ParamValue;
use crate::utils::{bigdecimal_to_u256, format_units_trimmed, is_hex_string, pow10};
use bigdecimal::BigDecimal;
use ethers_core::abi::{self, ParamType, Token};
use ethers_core::types::{Address, Bytes, U256};
use ethers_core::utils::to_checksum;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const WORD_SIZE: usize = 32;

/// 编码器支持的参数类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiKind {
    Address,
    Uint(usize),
    Bool,
    Bytes32,
}

impl AbiKind {
    fn param_type(&self) -> ParamType {
        match self {
            AbiKind::Address => ParamType::Address,
            AbiKind::Uint(bits) => ParamType::Uint(*bits),
            AbiKind::Bool => ParamType::Bool,
            AbiKind::Bytes32 => ParamType::FixedBytes(WORD_SIZE),
        }
    }
}

/// 解码后的返回值；解码失败时退化为 `Raw` 十六进制
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DecodedValue {
    Address(String),
    UnsignedInt(String),
    /// 已按 decimals 缩放的余额/授权/供应量
    Amount(String),
    Bool(bool),
    FixedBytes(String),
    Text(String),
    Raw(String),
}

impl DecodedValue {
    pub fn is_raw(&self) -> bool {
        matches!(self, DecodedValue::Raw(_))
    }
}

/// 解析 Solidity 类型名
pub fn resolve_kind(ty: &str) -> Result<AbiKind, AppError> {
    let ty = ty.trim();
    match ty {
        "address" => Ok(AbiKind::Address),
        "bool" => Ok(AbiKind::Bool),
        "bytes32" => Ok(AbiKind::Bytes32),
        "uint" => Ok(AbiKind::Uint(256)),
        _ => {
            let bits = ty
                .strip_prefix("uint")
                .and_then(|b| b.parse::<usize>().ok())
                .filter(|b| *b > 0 && *b <= 256 && b % 8 == 0)
                .ok_or_else(|| AppError::UnsupportedType(ty.to_string()))?;
            Ok(AbiKind::Uint(bits))
        }
    }
}

// ==================== 标量解析 ====================

/// 解析并校验地址；大小写混合时必须符合 EIP-55 校验和
pub fn parse_address(value: &str) -> Result<Address, AppError> {
    let value = value.trim();
    let body = value
        .strip_prefix("0x")
        .ok_or_else(|| AppError::InvalidAddress(format!("{} 缺少 0x 前缀", value)))?;
    if body.len() != 40 || !is_hex_string(body) {
        return Err(AppError::InvalidAddress(format!(
            "{} 不是 20 字节十六进制地址",
            value
        )));
    }
    let address = value
        .parse::<Address>()
        .map_err(|_| AppError::InvalidAddress(value.to_string()))?;

    let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
    if has_upper && has_lower && to_checksum(&address, None) != value {
        return Err(AppError::InvalidAddress(format!("{} 校验和错误", value)));
    }
    Ok(address)
}

/// 校验后的 EIP-55 格式地址
pub fn checksum_address(value: &str) -> Result<String, AppError> {
    parse_address(value).map(|a| to_checksum(&a, None))
}

/// 金额：十进制（可含小数），乘以 10^decimals 后必须为非负整数
pub fn parse_amount(value: &str, decimals: u8) -> Result<U256, AppError> {
    let value = value.trim();
    if value.is_empty() || value.starts_with("0x") {
        return Err(AppError::InvalidNumeric(format!(
            "金额 '{}' 必须是十进制数字",
            value
        )));
    }
    let parsed = BigDecimal::from_str(value)
        .map_err(|e| AppError::InvalidNumeric(format!("金额 '{}' 无法解析: {}", value, e)))?;
    bigdecimal_to_u256(&(parsed * pow10(decimals)))
}

/// 非金额整数：十进制或 0x 十六进制，原样传递不缩放
pub fn parse_uint(value: &str) -> Result<U256, AppError> {
    let value = value.trim();
    let invalid = || AppError::InvalidNumeric(format!("'{}' 不是合法的无符号整数", value));
    match value.strip_prefix("0x") {
        Some(hex_body) => {
            if !is_hex_string(hex_body) {
                return Err(invalid());
            }
            U256::from_str_radix(hex_body, 16).map_err(|_| invalid())
        }
        None => {
            if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            U256::from_dec_str(value).map_err(|_| invalid())
        }
    }
}

/// bytes32：十六进制，左补零到 32 字节
pub fn parse_bytes32(value: &str) -> Result<[u8; 32], AppError> {
    let body = value.trim().strip_prefix("0x").unwrap_or(value.trim());
    if body.len() > WORD_SIZE * 2 || (!body.is_empty() && !is_hex_string(body)) {
        return Err(AppError::InvalidNumeric(format!(
            "'{}' 不是合法的 bytes32",
            value
        )));
    }
    let padded = format!("{:0>64}", body);
    let mut word = [0u8; 32];
    hex::decode_to_slice(&padded, &mut word)
        .map_err(|e| AppError::InvalidNumeric(format!("'{}' 不是合法的 bytes32: {}", value, e)))?;
    Ok(word)
}

/// 单个参数转换为 ABI Token
pub fn to_token(param: &FunctionParam, value: &ParamValue, decimals: u8) -> Result<Token, AppError> {
    let kind = resolve_kind(&param.kind)?;
    let mismatch = || AppError::TypeMismatch {
        param: param.name.clone(),
        expected: param.kind.clone(),
        got: value.type_name().to_string(),
    };
    match (kind, value) {
        (AbiKind::Address, ParamValue::Address(s)) => Ok(Token::Address(parse_address(s)?)),
        (AbiKind::Uint(bits), ParamValue::UnsignedInt(s)) => {
            let n = if param.scaled {
                parse_amount(s, decimals)?
            } else {
                parse_uint(s)?
            };
            if n.bits() > bits {
                return Err(AppError::InvalidNumeric(format!(
                    "{} 超出 uint{} 范围",
                    s, bits
                )));
            }
            Ok(Token::Uint(n))
        }
        (AbiKind::Bool, ParamValue::Bool(b)) => Ok(Token::Bool(*b)),
        (AbiKind::Bytes32, ParamValue::FixedBytes(s)) => {
            Ok(Token::FixedBytes(parse_bytes32(s)?.to_vec()))
        }
        _ => Err(mismatch()),
    }
}

// ==================== 编码 ====================

/// selector || 每个参数一个 32 字节字（按声明顺序）
pub fn encode_call(
    signature: &FunctionSignature,
    args: &[ParamValue],
    decimals: u8,
) -> Result<Bytes, AppError> {
    if args.len() != signature.inputs.len() {
        return Err(AppError::ArgumentCountMismatch {
            expected: signature.inputs.len(),
            got: args.len(),
        });
    }
    let tokens = signature
        .inputs
        .iter()
        .zip(args)
        .map(|(param, value)| to_token(param, value, decimals))
        .collect::<Result<Vec<_>, _>>()?;

    let mut data = Vec::with_capacity(4 + WORD_SIZE * tokens.len());
    data.extend_from_slice(&signature.selector);
    data.extend_from_slice(&abi::encode(&tokens));
    Ok(data.into())
}

// ==================== 解码 ====================

/// 反向解析 call data 为参数列表（金额参数除以 10^decimals）
pub fn decode_arguments(
    signature: &FunctionSignature,
    data: &[u8],
    decimals: u8,
) -> Result<Vec<ParamValue>, AppError> {
    if data.len() < 4 || data[..4] != signature.selector {
        return Err(AppError::InvalidParameters(vec![format!(
            "call data does not start with selector {}",
            signature.selector_hex()
        )]));
    }
    let kinds = signature
        .inputs
        .iter()
        .map(|p| resolve_kind(&p.kind))
        .collect::<Result<Vec<_>, _>>()?;
    let types: Vec<ParamType> = kinds.iter().map(AbiKind::param_type).collect();
    let tokens = abi::decode(&types, &data[4..])
        .map_err(|e| AppError::Serialization(format!("call data decode failed: {}", e)))?;

    signature
        .inputs
        .iter()
        .zip(tokens)
        .map(|(param, token)| match token {
            Token::Address(a) => Ok(ParamValue::Address(to_checksum(&a, None))),
            Token::Uint(n) if param.scaled => {
                Ok(ParamValue::UnsignedInt(format_units_trimmed(n, decimals)))
            }
            Token::Uint(n) => Ok(ParamValue::UnsignedInt(n.to_string())),
            Token::Bool(b) => Ok(ParamValue::Bool(b)),
            Token::FixedBytes(b) => Ok(ParamValue::FixedBytes(format!("0x{}", hex::encode(b)))),
            other => Err(AppError::UnsupportedType(format!("{:?}", other))),
        })
        .collect()
}

/// 解码返回值；任何失败都退化为原始十六进制，而不是向上传播
pub fn decode_output(signature: &FunctionSignature, data: &[u8], decimals: u8) -> DecodedValue {
    let raw = || DecodedValue::Raw(format!("0x{}", hex::encode(data)));
    let Some(output) = signature.output.as_ref() else {
        return raw();
    };
    match try_decode_output(output, data, decimals) {
        Ok(value) => value,
        Err(e) => {
            log_debug!(
                "{} 返回值解码失败，保留原始数据: {}",
                signature.name,
                e
            );
            raw()
        }
    }
}

fn try_decode_output(
    output: &FunctionParam,
    data: &[u8],
    decimals: u8,
) -> Result<DecodedValue, AppError> {
    if output.kind == "string" {
        return decode_string(data).map(DecodedValue::Text);
    }
    let kind = resolve_kind(&output.kind)?;
    let token = abi::decode(&[kind.param_type()], data)
        .map_err(|e| AppError::Serialization(e.to_string()))?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Serialization("empty return data".to_string()))?;

    match token {
        Token::Address(a) => Ok(DecodedValue::Address(to_checksum(&a, None))),
        Token::Uint(n) if output.scaled => Ok(DecodedValue::Amount(format_units_trimmed(n, decimals))),
        Token::Uint(n) => Ok(DecodedValue::UnsignedInt(n.to_string())),
        Token::Bool(b) => Ok(DecodedValue::Bool(b)),
        Token::FixedBytes(b) => Ok(DecodedValue::FixedBytes(format!("0x{}", hex::encode(b)))),
        other => Err(AppError::UnsupportedType(format!("{:?}", other))),
    }
}

/// 字符串返回值：去掉 offset/length 头和尾部 NUL 填充
/// 兼容部分老合约用 bytes32 返回 symbol 的情况
pub fn decode_string(data: &[u8]) -> Result<String, AppError> {
    if data.len() == WORD_SIZE {
        let trimmed: Vec<u8> = data.iter().copied().take_while(|b| *b != 0).collect();
        return String::from_utf8(trimmed).map_err(|e| AppError::Serialization(e.to_string()));
    }
    match abi::decode(&[ParamType::String], data) {
        Ok(tokens) => match tokens.into_iter().next() {
            Some(Token::String(s)) => Ok(s.trim_end_matches('\0').to_string()),
            _ => Err(AppError::Serialization("not a string".to_string())),
        },
        Err(e) => Err(AppError::Serialization(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::contract::{FunctionCategory, Mutability};

    const RECIPIENT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    fn transfer() -> FunctionSignature {
        FunctionSignature::new(
            "transfer",
            vec![FunctionParam::address("to"), FunctionParam::amount("amount")],
            Mutability::NonPayable,
            FunctionCategory::Transfer,
        )
    }

    fn balance_of() -> FunctionSignature {
        FunctionSignature::new(
            "balanceOf",
            vec![FunctionParam::address("account")],
            Mutability::View,
            FunctionCategory::View,
        )
        .returns(FunctionParam::amount("balance"))
    }

    fn word(n: u64) -> Vec<u8> {
        let mut w = [0u8; 32];
        U256::from(n).to_big_endian(&mut w);
        w.to_vec()
    }

    #[test]
    fn encodes_transfer_with_scaled_amount() {
        let data = encode_call(
            &transfer(),
            &[ParamValue::address(RECIPIENT), ParamValue::uint("1.5")],
            6,
        )
        .unwrap();
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(&data[4 + 12..4 + 32], parse_address(RECIPIENT).unwrap().as_bytes());
        assert_eq!(&data[36..], word(1_500_000).as_slice());
    }

    #[test]
    fn unscaled_uint_passes_through() {
        let sig = FunctionSignature::new(
            "ownerOf",
            vec![FunctionParam::uint("tokenId")],
            Mutability::View,
            FunctionCategory::View,
        );
        let data = encode_call(&sig, &[ParamValue::uint("42")], 18).unwrap();
        assert_eq!(&data[4..], word(42).as_slice());
    }

    #[test]
    fn argument_count_mismatch() {
        let err = encode_call(&transfer(), &[ParamValue::address(RECIPIENT)], 6).unwrap_err();
        assert!(matches!(
            err,
            AppError::ArgumentCountMismatch { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn rejects_unsupported_and_malformed_values() {
        let sig = FunctionSignature::new(
            "setName",
            vec![FunctionParam::new("name", "string")],
            Mutability::NonPayable,
            FunctionCategory::Admin,
        );
        let err = encode_call(&sig, &[ParamValue::uint("1")], 0).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedType(_)));

        let bad_checksum = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAeD";
        let err = encode_call(
            &transfer(),
            &[ParamValue::address(bad_checksum), ParamValue::uint("1")],
            6,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidAddress(_)));

        let err = encode_call(
            &transfer(),
            &[ParamValue::address(RECIPIENT), ParamValue::uint("abc")],
            6,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidNumeric(_)));

        let err = encode_call(
            &transfer(),
            &[ParamValue::address(RECIPIENT), ParamValue::Bool(true)],
            6,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::TypeMismatch { .. }));
    }

    #[test]
    fn lowercase_address_is_accepted() {
        let lower = RECIPIENT.to_lowercase();
        assert_eq!(checksum_address(&lower).unwrap(), RECIPIENT);
    }

    #[test]
    fn uint_width_is_enforced() {
        let param = FunctionParam::new("v", "uint8");
        assert!(to_token(&param, &ParamValue::uint("255"), 0).is_ok());
        assert!(to_token(&param, &ParamValue::uint("256"), 0).is_err());
    }

    #[test]
    fn bytes32_is_left_padded() {
        let word = parse_bytes32("0x01").unwrap();
        assert_eq!(word[31], 1);
        assert!(word[..31].iter().all(|b| *b == 0));
        assert!(parse_bytes32(&format!("0x{}", "f".repeat(66))).is_err());
    }

    #[test]
    fn arguments_round_trip() {
        let sig = FunctionSignature::new(
            "grantRole",
            vec![FunctionParam::new("role", "bytes32"), FunctionParam::address("account")],
            Mutability::NonPayable,
            FunctionCategory::Admin,
        );
        let role = format!("0x{}", "ab".repeat(32));
        let args = vec![ParamValue::FixedBytes(role), ParamValue::address(RECIPIENT)];
        let data = encode_call(&sig, &args, 0).unwrap();
        assert_eq!(decode_arguments(&sig, &data, 0).unwrap(), args);

        let transfer_args = vec![ParamValue::address(RECIPIENT), ParamValue::uint("1.5")];
        let data = encode_call(&transfer(), &transfer_args, 6).unwrap();
        assert_eq!(decode_arguments(&transfer(), &data, 6).unwrap(), transfer_args);
    }

    #[test]
    fn decodes_scaled_balance() {
        let out = decode_output(&balance_of(), &word(2_500_000), 6);
        assert_eq!(out, DecodedValue::Amount("2.5".to_string()));
    }

    #[test]
    fn decodes_string_return() {
        let sig = FunctionSignature::new("symbol", vec![], Mutability::View, FunctionCategory::View)
            .returns(FunctionParam::new("symbol", "string"));
        let data = abi::encode(&[Token::String("USDC".to_string())]);
        assert_eq!(decode_output(&sig, &data, 6), DecodedValue::Text("USDC".to_string()));

        let mut bytes32 = [0u8; 32];
        bytes32[..3].copy_from_slice(b"MKR");
        assert_eq!(decode_output(&sig, &bytes32, 18), DecodedValue::Text("MKR".to_string()));
    }

    #[test]
    fn decode_failure_falls_back_to_raw_hex() {
        let out = decode_output(&balance_of(), &[0xde, 0xad], 6);
        assert_eq!(out, DecodedValue::Raw("0xdead".to_string()));
        assert!(out.is_raw());
    }
}
