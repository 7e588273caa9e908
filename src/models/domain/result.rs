use crate::infrastructure::abi::DecodedValue;
use crate::models::domain::analysis::{CategoryAnalysis, DecodedError, GasCost, GasEfficiency};
use crate::models::domain::contract::FunctionCategory;
use crate::models::domain::request::{ParamValue, SimulationRequest};
use chrono::{DateTime, Utc};
use ethers_core::types::{Address, U256};
use serde::{Deserialize, Serialize};

/// 从事件日志解码得到的状态变化，没有日志时绝不伪造
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StateChange {
    Transfer {
        token: Address,
        from: Address,
        to: Address,
        amount: String,
    },
    Approval {
        token: Address,
        owner: Address,
        spender: Address,
        amount: String,
    },
    Mint {
        token: Address,
        to: Address,
        amount: String,
    },
    Burn {
        token: Address,
        from: Address,
        amount: String,
    },
}

/// trace 中的内部调用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalCall {
    pub call_type: String,
    pub from: Address,
    pub to: Option<Address>,
    pub gas_used: u64,
    pub value: Option<U256>,
    pub error: Option<String>,
    pub depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub success: bool,
    /// 仅因余额/授权不足而回滚：资金充足时调用会成功
    pub hypothetical_success: bool,
    pub gas_used: u64,
    pub gas_category: Option<GasEfficiency>,
    pub operation_category: FunctionCategory,
    pub output: Option<DecodedValue>,
    pub error: Option<DecodedError>,
    pub state_changes: Vec<StateChange>,
    pub internal_calls: Vec<InternalCall>,
    pub warnings: Vec<String>,
    pub cost: Option<GasCost>,
    pub timestamp: DateTime<Utc>,
    pub request: SimulationRequest,
}

impl SimulationResult {
    /// 未产生可用结果的失败记录
    pub fn failed(
        request: SimulationRequest,
        category: FunctionCategory,
        error: DecodedError,
    ) -> Self {
        Self {
            success: false,
            hypothetical_success: false,
            gas_used: 0,
            gas_category: None,
            operation_category: category,
            output: None,
            error: Some(error),
            state_changes: Vec::new(),
            internal_calls: Vec::new(),
            warnings: Vec::new(),
            cost: None,
            timestamp: Utc::now(),
            request,
        }
    }

    /// success 或 hypothetical_success
    pub fn is_usable(&self) -> bool {
        self.success || self.hypothetical_success
    }

    pub fn function_name(&self) -> &str {
        &self.request.function_name
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub variant: String,
    pub parameters: Vec<ParamValue>,
    pub result: SimulationResult,
    /// gas ÷ 成功变体中的最小 gas；可用结果少于两个时为 None
    pub relative_gas_cost: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub operations: Vec<SimulationResult>,
    pub total_gas: u64,
    pub successful_operations: usize,
    pub total_operations: usize,
    pub success_rate: f64,
    /// 没有任何操作硬失败（与单个结果的 success 标志相互独立）
    pub batch_success: bool,
    pub gas_distribution: Vec<CategoryAnalysis>,
    pub timestamp: DateTime<Utc>,
}
