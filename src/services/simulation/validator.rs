//! 调用前参数预检：errors 阻断执行，warnings 仅提示
use crate::infrastructure::abi::codec::to_token;
use crate::infrastructure::abi::{AbiKind, parse_amount, parse_uint, resolve_kind};
use crate::models::domain::contract::{FunctionCategory, FunctionSignature};
use crate::models::domain::request::ParamValue;
use crate::utils::check::is_zero_address;
use ethers_core::types::U256;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 超过这个整币数量给出警告
const LARGE_AMOUNT_WHOLE_TOKENS: u64 = 1_000_000_000_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// 参数形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgShape {
    Address,
    Amount,
    Uint,
    Bool,
    Bytes32,
}

impl ArgShape {
    fn accepts(&self, value: &ParamValue) -> bool {
        matches!(
            (self, value),
            (ArgShape::Address, ParamValue::Address(_))
                | (ArgShape::Amount | ArgShape::Uint, ParamValue::UnsignedInt(_))
                | (ArgShape::Bool, ParamValue::Bool(_))
                | (ArgShape::Bytes32, ParamValue::FixedBytes(_))
        )
    }

    fn label(&self) -> &'static str {
        match self {
            ArgShape::Address => "address",
            ArgShape::Amount => "amount",
            ArgShape::Uint => "uint",
            ArgShape::Bool => "bool",
            ArgShape::Bytes32 => "bytes32",
        }
    }
}

/// 函数级规则：参数个数与每个位置的形态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRule {
    pub shape: Vec<ArgShape>,
}

impl FunctionRule {
    pub fn new(shape: &[ArgShape]) -> Self {
        Self {
            shape: shape.to_vec(),
        }
    }

    fn check(&self, function: &str, args: &[ParamValue], errors: &mut Vec<String>) {
        let expected = self
            .shape
            .iter()
            .map(|s| s.label())
            .collect::<Vec<_>>()
            .join(", ");
        if args.len() != self.shape.len() {
            errors.push(format!(
                "{} requires {} argument(s) [{}], got {}",
                function,
                self.shape.len(),
                expected,
                args.len()
            ));
            return;
        }
        for (i, (shape, value)) in self.shape.iter().zip(args).enumerate() {
            if !shape.accepts(value) {
                errors.push(format!(
                    "{} argument #{} must be {}, got {}",
                    function,
                    i + 1,
                    shape.label(),
                    value.type_name()
                ));
            }
        }
    }
}

pub struct Validator {
    rules: HashMap<String, FunctionRule>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// 内置 ERC20 常用函数规则
    pub fn new() -> Self {
        use ArgShape::{Address, Amount};
        let rules = [
            ("transfer", vec![Address, Amount]),
            ("transferFrom", vec![Address, Address, Amount]),
            ("approve", vec![Address, Amount]),
            ("mint", vec![Address, Amount]),
            ("burn", vec![Amount]),
            ("balanceOf", vec![Address]),
            ("allowance", vec![Address, Address]),
        ]
        .into_iter()
        .map(|(name, shape)| (name.to_string(), FunctionRule { shape }))
        .collect();
        Self { rules }
    }

    /// 新增或替换某个函数的规则，不影响其他函数
    pub fn with_rule(mut self, function: &str, rule: FunctionRule) -> Self {
        self.rules.insert(function.to_string(), rule);
        self
    }

    pub fn rule(&self, function: &str) -> Option<&FunctionRule> {
        self.rules.get(function)
    }

    pub fn validate(
        &self,
        signature: &FunctionSignature,
        args: &[ParamValue],
        decimals: u8,
    ) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();

        if let Some(rule) = self.rules.get(&signature.name) {
            rule.check(&signature.name, args, &mut outcome.errors);
            if !outcome.errors.is_empty() {
                return outcome;
            }
        }

        if args.len() != signature.inputs.len() {
            outcome.errors.push(format!(
                "{} expects {} argument(s), got {}",
                signature.name,
                signature.inputs.len(),
                args.len()
            ));
            return outcome;
        }

        for (param, value) in signature.inputs.iter().zip(args) {
            if let Err(e) = to_token(param, value, decimals) {
                outcome.errors.push(format!("{}: {}", param.name, e));
            }
        }
        if outcome.errors.is_empty() {
            collect_warnings(signature, args, decimals, &mut outcome.warnings);
        }
        outcome
    }
}

fn is_sensitive(category: FunctionCategory) -> bool {
    matches!(
        category,
        FunctionCategory::Transfer
            | FunctionCategory::Approval
            | FunctionCategory::Mint
            | FunctionCategory::Admin
    )
}

fn collect_warnings(
    signature: &FunctionSignature,
    args: &[ParamValue],
    decimals: u8,
    warnings: &mut Vec<String>,
) {
    // 精度过大时阈值超出 uint256，任何金额都不会触发警告
    let large = U256::from(10u64)
        .checked_pow(U256::from(decimals))
        .and_then(|unit| unit.checked_mul(U256::from(LARGE_AMOUNT_WHOLE_TOKENS)));

    for (param, value) in signature.inputs.iter().zip(args) {
        match value {
            ParamValue::Address(s) if is_sensitive(signature.category) && is_zero_address(s) => {
                warnings.push(format!(
                    "{}: zero address passed to {}",
                    param.name, signature.name
                ));
            }
            ParamValue::UnsignedInt(s) if param.scaled => {
                let Ok(amount) = parse_amount(s, decimals) else {
                    continue;
                };
                if amount.is_zero()
                    && matches!(
                        signature.category,
                        FunctionCategory::Transfer | FunctionCategory::Approval
                    )
                {
                    warnings.push(format!("{}: zero-value {}", param.name, signature.name));
                } else if large.is_some_and(|large| amount > large) {
                    warnings.push(format!(
                        "{}: amount {} exceeds {} whole tokens",
                        param.name, s, LARGE_AMOUNT_WHOLE_TOKENS
                    ));
                }
            }
            ParamValue::UnsignedInt(s) => {
                // 非金额整数达到类型上限通常是误填
                if let (Ok(AbiKind::Uint(bits)), Ok(n)) =
                    (resolve_kind(&param.kind), parse_uint(s))
                {
                    if bits == 256 && n == U256::MAX {
                        warnings.push(format!("{}: value is the maximum uint256", param.name));
                    }
                }
            }
            _ => {}
        }
    }
}
