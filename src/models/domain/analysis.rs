//! 错误解码与 gas 分析产出的数据类型
use crate::models::domain::contract::FunctionCategory;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedError {
    /// 4 字节选择器（0x 前缀小写十六进制）
    pub code: Option<String>,
    /// 面向用户的信息：解码成功时为解码文本，否则为原始信息
    pub message: String,
    /// 解码出的文本；无法解码时为 None
    pub decoded: Option<String>,
    pub severity: Severity,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GasEfficiency {
    #[serde(rename = "Highly Efficient")]
    HighlyEfficient,
    #[serde(rename = "Efficient")]
    Efficient,
    #[serde(rename = "Moderate")]
    Moderate,
    #[serde(rename = "High Gas")]
    HighGas,
    #[serde(rename = "Very High Gas")]
    VeryHighGas,
}

impl fmt::Display for GasEfficiency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GasEfficiency::HighlyEfficient => "Highly Efficient",
            GasEfficiency::Efficient => "Efficient",
            GasEfficiency::Moderate => "Moderate",
            GasEfficiency::HighGas => "High Gas",
            GasEfficiency::VeryHighGas => "Very High Gas",
        };
        f.write_str(s)
    }
}

/// 分类级别的效率档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EfficiencyTier {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAnalysis {
    pub category: FunctionCategory,
    pub count: usize,
    pub total_gas: u64,
    pub average_gas: u64,
    /// 占全部 gas 的百分比
    pub share_percent: f64,
    pub tier: EfficiencyTier,
    /// 仅在 tier 不是 High 时给出
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasExtreme {
    /// 在输入结果中的下标
    pub index: usize,
    pub function_name: String,
    pub gas_used: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasComparison {
    pub most_efficient: Option<GasExtreme>,
    pub least_efficient: Option<GasExtreme>,
    pub average_gas: u64,
    pub range: u64,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasCost {
    pub gas_used: u64,
    pub gas_price_gwei: String,
    /// 以原生币计价（十进制字符串）
    pub cost_native: String,
    pub cost_usd: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_labels() {
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), r#""high""#);
        assert_eq!(
            serde_json::to_string(&GasEfficiency::VeryHighGas).unwrap(),
            r#""Very High Gas""#
        );
        assert_eq!(GasEfficiency::HighlyEfficient.to_string(), "Highly Efficient");
        let tier: EfficiencyTier = serde_json::from_str(r#""medium""#).unwrap();
        assert_eq!(tier, EfficiencyTier::Medium);
    }
}
