use crate::errors::error::AppError;
use ethers_core::types::{Address, H256};
use ethers_core::utils::{id, keccak256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// 支持的目标网络
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Sepolia,
    Holesky,
    Polygon,
    Arbitrum,
    Optimism,
    Base,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Sepolia => "sepolia",
            Network::Holesky => "holesky",
            Network::Polygon => "polygon",
            Network::Arbitrum => "arbitrum",
            Network::Optimism => "optimism",
            Network::Base => "base",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "ethereum" => Ok(Network::Mainnet),
            "sepolia" => Ok(Network::Sepolia),
            "holesky" => Ok(Network::Holesky),
            "polygon" => Ok(Network::Polygon),
            "arbitrum" => Ok(Network::Arbitrum),
            "optimism" => Ok(Network::Optimism),
            "base" => Ok(Network::Base),
            other => Err(AppError::UnsupportedNetwork(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    Fungible,
    NonFungible,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mutability {
    View,
    Pure,
    NonPayable,
    Payable,
}

impl Mutability {
    pub fn is_payable(&self) -> bool {
        matches!(self, Mutability::Payable)
    }
}

/// 函数语义分类（用于 gas 分析）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionCategory {
    Transfer,
    Approval,
    Mint,
    Burn,
    Admin,
    View,
    Other,
}

impl fmt::Display for FunctionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FunctionCategory::Transfer => "transfer",
            FunctionCategory::Approval => "approval",
            FunctionCategory::Mint => "mint",
            FunctionCategory::Burn => "burn",
            FunctionCategory::Admin => "admin",
            FunctionCategory::View => "view",
            FunctionCategory::Other => "other",
        };
        f.write_str(s)
    }
}

/// 函数参数 / 返回值声明
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionParam {
    pub name: String,
    /// Solidity 规范类型名，如 `address`、`uint256`
    pub kind: String,
    /// 是否按合约精度缩放（金额类参数、余额/授权/供应量返回值）
    pub scaled: bool,
}

impl FunctionParam {
    pub fn new(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            scaled: false,
        }
    }

    pub fn address(name: &str) -> Self {
        Self::new(name, "address")
    }

    /// 金额参数：uint256 且按 decimals 缩放
    pub fn amount(name: &str) -> Self {
        Self {
            scaled: true,
            ..Self::new(name, "uint256")
        }
    }

    pub fn uint(name: &str) -> Self {
        Self::new(name, "uint256")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub selector: [u8; 4],
    pub name: String,
    pub inputs: Vec<FunctionParam>,
    pub output: Option<FunctionParam>,
    pub mutability: Mutability,
    pub category: FunctionCategory,
}

impl FunctionSignature {
    pub fn new(
        name: &str,
        inputs: Vec<FunctionParam>,
        mutability: Mutability,
        category: FunctionCategory,
    ) -> Self {
        let canonical = canonical_signature(name, inputs.iter().map(|p| p.kind.as_str()));
        Self {
            selector: id(canonical),
            name: name.to_string(),
            inputs,
            output: None,
            mutability,
            category,
        }
    }

    pub fn returns(mut self, output: FunctionParam) -> Self {
        self.output = Some(output);
        self
    }

    /// 例如 `transfer(address,uint256)`
    pub fn canonical(&self) -> String {
        canonical_signature(&self.name, self.inputs.iter().map(|p| p.kind.as_str()))
    }

    pub fn selector_hex(&self) -> String {
        format!("0x{}", hex::encode(self.selector))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventParam {
    pub name: String,
    pub kind: String,
    pub indexed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSignature {
    pub topic: H256,
    pub name: String,
    pub inputs: Vec<EventParam>,
}

impl EventSignature {
    pub fn new(name: &str, inputs: &[(&str, &str, bool)]) -> Self {
        let canonical = canonical_signature(name, inputs.iter().map(|(_, kind, _)| *kind));
        Self {
            topic: H256::from(keccak256(canonical.as_bytes())),
            name: name.to_string(),
            inputs: inputs
                .iter()
                .map(|(name, kind, indexed)| EventParam {
                    name: name.to_string(),
                    kind: kind.to_string(),
                    indexed: *indexed,
                })
                .collect(),
        }
    }
}

/// 合约描述符，注册后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDescriptor {
    pub address: Address,
    pub network: Network,
    pub symbol: String,
    pub decimals: u8,
    pub contract_type: ContractType,
    pub functions: BTreeMap<String, FunctionSignature>,
    pub events: BTreeMap<String, EventSignature>,
}

impl ContractDescriptor {
    pub fn function(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions.get(name)
    }

    pub fn has_event_topic(&self, topic: &H256) -> bool {
        self.events.values().any(|e| &e.topic == topic)
    }
}

fn canonical_signature<'a>(name: &str, kinds: impl Iterator<Item = &'a str>) -> String {
    format!("{}({})", name, kinds.collect::<Vec<_>>().join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_match_well_known_values() {
        let transfer = FunctionSignature::new(
            "transfer",
            vec![FunctionParam::address("to"), FunctionParam::amount("amount")],
            Mutability::NonPayable,
            FunctionCategory::Transfer,
        );
        assert_eq!(transfer.selector_hex(), "0xa9059cbb");
        assert_eq!(transfer.canonical(), "transfer(address,uint256)");

        let balance_of = FunctionSignature::new(
            "balanceOf",
            vec![FunctionParam::address("account")],
            Mutability::View,
            FunctionCategory::View,
        );
        assert_eq!(balance_of.selector, [0x70, 0xa0, 0x82, 0x31]);
    }

    #[test]
    fn transfer_event_topic() {
        let event = EventSignature::new(
            "Transfer",
            &[("from", "address", true), ("to", "address", true), ("value", "uint256", false)],
        );
        assert_eq!(
            format!("{:#x}", event.topic),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn network_parsing_is_case_insensitive() {
        assert_eq!("Mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("ethereum".parse::<Network>().unwrap(), Network::Mainnet);
        assert!("dogechain".parse::<Network>().is_err());
    }
}
