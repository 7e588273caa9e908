use crate::models::domain::contract::Network;
use ethers_core::types::{BlockId, BlockNumber, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 调用参数（带类型标签的联合体）
///
/// 地址和数值保留原始字符串，由编码器负责校验和转换，
/// 这样预检阶段可以拿到完整的错误原因。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParamValue {
    Address(String),
    /// 十进制字符串；金额参数允许小数（按合约精度缩放），其余必须为整数，也接受 0x 十六进制
    UnsignedInt(String),
    Bool(bool),
    /// 32 字节十六进制字符串，不足左补零
    FixedBytes(String),
}

impl ParamValue {
    pub fn address(value: impl Into<String>) -> Self {
        ParamValue::Address(value.into())
    }

    pub fn uint(value: impl Into<String>) -> Self {
        ParamValue::UnsignedInt(value.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Address(_) => "address",
            ParamValue::UnsignedInt(_) => "uint",
            ParamValue::Bool(_) => "bool",
            ParamValue::FixedBytes(_) => "bytes32",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BlockTag {
    #[default]
    Latest,
    Pending,
    Earliest,
    Safe,
    Finalized,
}

/// 区块引用：标签或具体高度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockRef {
    Number(u64),
    Tag(BlockTag),
}

impl Default for BlockRef {
    fn default() -> Self {
        BlockRef::Tag(BlockTag::Latest)
    }
}

impl BlockRef {
    pub fn to_block_id(&self) -> BlockId {
        let number = match self {
            BlockRef::Number(n) => BlockNumber::Number((*n).into()),
            BlockRef::Tag(BlockTag::Latest) => BlockNumber::Latest,
            BlockRef::Tag(BlockTag::Pending) => BlockNumber::Pending,
            BlockRef::Tag(BlockTag::Earliest) => BlockNumber::Earliest,
            BlockRef::Tag(BlockTag::Safe) => BlockNumber::Safe,
            BlockRef::Tag(BlockTag::Finalized) => BlockNumber::Finalized,
        };
        BlockId::Number(number)
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockRef::Number(n) => write!(f, "{}", n),
            BlockRef::Tag(tag) => {
                let s = match tag {
                    BlockTag::Latest => "latest",
                    BlockTag::Pending => "pending",
                    BlockTag::Earliest => "earliest",
                    BlockTag::Safe => "safe",
                    BlockTag::Finalized => "finalized",
                };
                f.write_str(s)
            }
        }
    }
}

/// 单次模拟请求，构造后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub contract: String,
    pub function_name: String,
    pub caller: String,
    #[serde(default)]
    pub args: Vec<ParamValue>,
    #[serde(default)]
    pub gas_limit: Option<u64>,
    #[serde(default)]
    pub gas_price: Option<U256>,
    #[serde(default)]
    pub value: Option<U256>,
    #[serde(default)]
    pub block: BlockRef,
    pub network: Network,
}

impl SimulationRequest {
    pub fn new(
        network: Network,
        contract: &str,
        function_name: &str,
        caller: &str,
        args: Vec<ParamValue>,
    ) -> Self {
        Self {
            contract: contract.to_string(),
            function_name: function_name.to_string(),
            caller: caller.to_string(),
            args,
            gas_limit: None,
            gas_price: None,
            value: None,
            block: BlockRef::default(),
            network,
        }
    }

    pub fn at_block(mut self, block: BlockRef) -> Self {
        self.block = block;
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_gas(mut self, gas_limit: u64, gas_price: Option<U256>) -> Self {
        self.gas_limit = Some(gas_limit);
        self.gas_price = gas_price;
        self
    }
}

/// 多组参数对比同一函数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub contract: String,
    pub function_name: String,
    pub caller: String,
    pub parameter_sets: Vec<Vec<ParamValue>>,
    pub network: Network,
    #[serde(default)]
    pub block: BlockRef,
}

/// 批量模拟中的单个操作
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOperation {
    pub contract: String,
    pub function_name: String,
    #[serde(default)]
    pub args: Vec<ParamValue>,
    #[serde(default)]
    pub value: Option<U256>,
    #[serde(default)]
    pub gas_limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub caller: String,
    pub operations: Vec<BatchOperation>,
    pub network: Network,
    #[serde(default)]
    pub block: BlockRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_value_json_shape() {
        let v = ParamValue::uint("1.5");
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"type":"unsigned_int","value":"1.5"}"#);
        let back: ParamValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn block_ref_accepts_tag_or_number() {
        let tag: BlockRef = serde_json::from_str(r#""finalized""#).unwrap();
        assert_eq!(tag, BlockRef::Tag(BlockTag::Finalized));
        let number: BlockRef = serde_json::from_str("19000000").unwrap();
        assert_eq!(number, BlockRef::Number(19_000_000));
        assert_eq!(number.to_string(), "19000000");
        assert_eq!(BlockRef::default().to_string(), "latest");
    }

    #[test]
    fn request_defaults_from_json() {
        let req: SimulationRequest = serde_json::from_str(
            r#"{
                "contract": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
                "function_name": "balanceOf",
                "caller": "0x0000000000000000000000000000000000000001",
                "args": [{"type": "address", "value": "0x0000000000000000000000000000000000000002"}],
                "network": "mainnet"
            }"#,
        )
        .unwrap();
        assert_eq!(req.block, BlockRef::default());
        assert!(req.gas_limit.is_none());
        assert_eq!(req.args.len(), 1);
    }
}
