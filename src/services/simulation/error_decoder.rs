//! revert 数据 / 节点错误信息解码
//!
//! 解码顺序：已知 4 字节选择器表 -> Error(string) -> Panic(uint256)
//! -> 文本形式的 "execution reverted: ..." -> 原样返回（medium）。
use crate::errors::error::AppError;
use crate::infrastructure::protocol::{ERROR_STRING_SELECTOR, PANIC_SELECTOR};
use ethers_core::abi::{ParamType, Token, decode};
use once_cell::sync::Lazy;
use std::collections::HashMap;

pub use crate::models::domain::analysis::{DecodedError, Severity};

/// 已知错误选择器 -> 标准信息。导出/缓存的结果依赖这些文本，不要改动。
pub const KNOWN_ERRORS: &[(&str, &str)] = &[
    ("0x356680b7", "transfer amount exceeds balance"),
    ("0xe450d38c", "insufficient balance"),
    ("0xfb8f41b2", "insufficient allowance"),
    ("0x96c6fd1e", "invalid sender"),
    ("0xec442f05", "invalid receiver"),
    ("0xe602df05", "invalid approver"),
    ("0x94280d62", "invalid spender"),
    ("0xd93c0665", "contract is paused"),
    ("0x8dfc202b", "contract is not paused"),
    ("0x118cdaa7", "caller is not the owner"),
    ("0xe2517d3f", "account is missing role"),
    ("0xf645eedf", "invalid signature"),
    ("0x62791302", "permit signature expired"),
    ("0x7e273289", "nonexistent token"),
    ("0x177e802f", "insufficient approval for token"),
    ("0xffa4e618", "account is blacklisted"),
    ("0xf4d678b8", "insufficient balance"),
    ("0x13be252b", "insufficient allowance"),
    ("0xd92e233d", "zero address not allowed"),
];

static KNOWN_ERROR_INDEX: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| KNOWN_ERRORS.iter().copied().collect());

/// 资金不足类选择器：调用方有足够余额/授权时即可成功
const HYPOTHETICAL_CODES: &[&str] = &[
    "0x356680b7",
    "0xe450d38c",
    "0xfb8f41b2",
    "0xf4d678b8",
    "0x13be252b",
];

const HYPOTHETICAL_KEYWORDS: &[&str] = &[
    "insufficient balance",
    "insufficient allowance",
    "exceeds balance",
    "exceeds allowance",
];

const HIGH_KEYWORDS: &[&str] = &["balance", "allowance", "paused", "blacklist"];
const MEDIUM_KEYWORDS: &[&str] = &[
    "zero address",
    "zero-address",
    "signature",
    "expired",
    "role",
];

/// (关键字, 建议)，按顺序匹配第一条
const SUGGESTIONS: &[(&str, &str)] = &[
    ("allowance", "Approve the spender for at least the requested amount before calling"),
    ("balance", "Fund the sending account with enough tokens or lower the amount"),
    ("not paused", "The operation is only available while the contract is paused"),
    ("paused", "Wait until the contract is unpaused"),
    ("blacklist", "The account is blacklisted by the token issuer; use another account"),
    ("zero address", "Use a non-zero address"),
    ("zero-address", "Use a non-zero address"),
    ("expired", "Sign again with a later deadline"),
    ("signature", "Check the signer and the signed payload"),
    ("role", "Call from an account that holds the required role"),
    ("owner", "Call from the contract owner"),
    ("nonexistent", "Check that the token id has been minted"),
];

const REVERT_PREFIXES: &[&str] = &[
    "execution reverted: ",
    "reverted with reason string ",
    "revert: ",
];

/// 解码节点错误信息和（可选的）revert data
pub fn decode_revert(message: &str, data: Option<&[u8]>) -> DecodedError {
    let payload = data
        .filter(|d| !d.is_empty())
        .map(|d| d.to_vec())
        .or_else(|| embedded_hex(message));

    if let Some(bytes) = payload.as_deref().filter(|b| b.len() >= 4) {
        let selector = format!("0x{}", hex::encode(&bytes[..4]));
        if let Some(known) = known_error(&selector) {
            return known;
        }
        if bytes[..4] == ERROR_STRING_SELECTOR {
            if let Some(reason) = decode_error_string(&bytes[4..]) {
                return from_text(Some(selector), reason);
            }
        }
        if bytes[..4] == PANIC_SELECTOR {
            if let Some(reason) = decode_panic(&bytes[4..]) {
                return from_text(Some(selector), reason);
            }
        }
    }

    if let Some(known) = standalone_selectors(message).find_map(|s| known_error(&s)) {
        return known;
    }

    if let Some(reason) = textual_reason(message) {
        return from_text(None, reason);
    }

    DecodedError {
        code: payload
            .as_deref()
            .filter(|b| b.len() >= 4)
            .map(|b| format!("0x{}", hex::encode(&b[..4]))),
        message: if message.trim().is_empty() {
            payload
                .map(|b| format!("0x{}", hex::encode(b)))
                .unwrap_or_else(|| "unknown error".to_string())
        } else {
            message.to_string()
        },
        decoded: None,
        severity: Severity::Medium,
        suggestion: None,
    }
}

/// 命令行入口：输入既可能是十六进制 revert data，也可能是错误文本
pub fn decode_input(input: &str) -> DecodedError {
    let trimmed = input.trim();
    match trimmed.strip_prefix("0x").map(hex::decode) {
        Some(Ok(bytes)) => decode_revert("", Some(bytes.as_slice())),
        _ => decode_revert(trimmed, None),
    }
}

/// 把模拟过程中的错误解码为 DecodedError
pub fn decode_error(err: &AppError) -> DecodedError {
    match err {
        AppError::CallReverted { message, data } => {
            decode_revert(message, data.as_ref().map(|d| &d.0[..]))
        }
        other => decode_revert(&other.to_string(), None),
    }
}

impl DecodedError {
    /// 仅因余额/授权不足而失败：资金充足时即会成功
    pub fn is_hypothetical_success(&self) -> bool {
        if let Some(code) = &self.code {
            if HYPOTHETICAL_CODES.contains(&code.as_str()) {
                return true;
            }
        }
        let text = self.message.to_lowercase();
        HYPOTHETICAL_KEYWORDS.iter().any(|k| text.contains(k))
    }
}

fn known_error(selector: &str) -> Option<DecodedError> {
    KNOWN_ERROR_INDEX
        .get_key_value(selector)
        .map(|(code, message)| from_text(Some(code.to_string()), message.to_string()))
}

fn from_text(code: Option<String>, text: String) -> DecodedError {
    DecodedError {
        code,
        severity: severity_of(&text),
        suggestion: suggestion_for(&text),
        decoded: Some(text.clone()),
        message: text,
    }
}

pub fn severity_of(message: &str) -> Severity {
    let lower = message.to_lowercase();
    if HIGH_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Severity::High
    } else if MEDIUM_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn suggestion_for(message: &str) -> Option<String> {
    let lower = message.to_lowercase();
    SUGGESTIONS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, s)| s.to_string())
}

fn decode_error_string(body: &[u8]) -> Option<String> {
    match decode(&[ParamType::String], body).ok()?.pop()? {
        Token::String(s) => Some(s),
        _ => None,
    }
}

fn decode_panic(body: &[u8]) -> Option<String> {
    let code = match decode(&[ParamType::Uint(256)], body).ok()?.pop()? {
        Token::Uint(c) => c,
        _ => return None,
    };
    let reason = match code.low_u64() {
        0x01 => "Panic: Assertion failed".to_string(),
        0x11 => "Panic: Arithmetic overflow".to_string(),
        0x12 => "Panic: Division by zero".to_string(),
        0x21 => "Panic: Invalid enum value".to_string(),
        0x22 => "Panic: Invalid storage byte array access".to_string(),
        0x31 => "Panic: Pop on empty array".to_string(),
        0x32 => "Panic: Array access out of bounds".to_string(),
        0x41 => "Panic: Out of memory".to_string(),
        0x51 => "Panic: Invalid internal function call".to_string(),
        other => format!("Panic: Unknown error code (0x{:x})", other),
    };
    Some(reason)
}

/// "execution reverted: reason" 一类的文本
fn textual_reason(message: &str) -> Option<String> {
    let lower = message.to_ascii_lowercase();
    REVERT_PREFIXES.iter().find_map(|prefix| {
        let start = lower.find(prefix)? + prefix.len();
        let reason = message[start..].trim().trim_matches('\'').trim();
        (!reason.is_empty() && !reason.starts_with("0x")).then(|| reason.to_string())
    })
}

/// 信息里内嵌的第一段 0x 十六进制数据（至少一个选择器长）
fn embedded_hex(message: &str) -> Option<Vec<u8>> {
    message.match_indices("0x").find_map(|(i, _)| {
        let digits: String = message[i + 2..]
            .chars()
            .take_while(|c| c.is_ascii_hexdigit())
            .collect();
        // 选择器 + 若干 32 字节参数；地址之类的其他十六进制不算
        if digits.len() >= 8 && (digits.len() - 8) % 64 == 0 {
            hex::decode(&digits).ok()
        } else {
            None
        }
    })
}

/// 文本中独立出现的 `0x` + 8 位十六进制（不是更长十六进制串的前缀）
fn standalone_selectors(message: &str) -> impl Iterator<Item = String> + '_ {
    message
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| {
            token.len() == 10
                && (token.starts_with("0x") || token.starts_with("0X"))
                && token[2..].chars().all(|c| c.is_ascii_hexdigit())
        })
        .map(|token| format!("0x{}", token[2..].to_ascii_lowercase()))
}
