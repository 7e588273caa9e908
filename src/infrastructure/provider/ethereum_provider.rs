use super::trace::{CallTrace, call_tracer_options, parse_call_trace};
use crate::config::NetworkConfig;
use crate::errors::error::AppError;
use crate::log_info;
use async_trait::async_trait;
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{BlockId, BlockNumber, Bytes, U256};
use ethers_providers::{Http, Middleware, Provider, ProviderError, RpcError};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

/// 对节点的只读访问（模拟调用 / gas 估算 / 执行轨迹）
#[async_trait]
pub trait ProviderTrait: Send + Sync {
    /// eth_call；节点拒绝执行时返回 CallReverted（携带 revert data）
    async fn call(&self, tx: &TypedTransaction, block: Option<BlockId>) -> Result<Bytes, AppError>;
    async fn estimate_gas(&self, tx: &TypedTransaction, block: Option<BlockId>)
    -> Result<U256, AppError>;
    /// debug_traceCall；节点不支持时返回 Trace 错误
    async fn trace_call(
        &self,
        tx: &TypedTransaction,
        block: Option<BlockId>,
    ) -> Result<CallTrace, AppError>;
}

pub struct EthereumProvider {
    providers: Vec<Arc<Provider<Http>>>,
    index: AtomicUsize,
}

impl EthereumProvider {
    /// 每个 api key 生成一个 Provider，请求轮询分发；未配置 key 时直接使用 rpc_url
    pub fn new(config: &NetworkConfig) -> Result<Self, AppError> {
        let keys: Vec<&str> = config
            .api_keys
            .split(',')
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect();

        let urls = if keys.is_empty() {
            vec![Url::parse(&config.rpc_url).map_err(|e| AppError::InvalidUrl(e.to_string()))?]
        } else {
            keys.iter()
                .map(|key| endpoint_with_key(&config.rpc_url, key))
                .collect::<Result<Vec<_>, _>>()?
        };

        let providers = urls
            .iter()
            .map(|url| {
                Provider::<Http>::try_from(url.as_str())
                    .map(Arc::new)
                    .map_err(|e| AppError::InvalidUrl(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        log_info!("成功初始化 {} 个RPC Provider (chain_id={})", providers.len(), config.chain_id);

        Ok(Self {
            providers,
            index: AtomicUsize::new(0),
        })
    }

    pub fn get_provider(&self) -> Arc<Provider<Http>> {
        let i = self.index.fetch_add(1, Ordering::Relaxed);
        self.providers[i % self.providers.len()].clone()
    }
}

fn endpoint_with_key(rpc_url: &str, key: &str) -> Result<Url, AppError> {
    let joined = if rpc_url.ends_with('/') {
        format!("{}{}", rpc_url, key)
    } else {
        format!("{}/{}", rpc_url, key)
    };
    Url::parse(&joined).map_err(|e| AppError::InvalidUrl(e.to_string()))
}

/// 节点返回了 JSON-RPC 错误响应（执行层面的拒绝，重试无意义）
pub(crate) fn is_node_rejection(err: &ProviderError) -> bool {
    err.as_error_response().is_some()
}

/// 把节点错误归类为 CallReverted，其余视为传输层错误
pub(crate) fn classify_call_error(err: ProviderError) -> AppError {
    match err.as_error_response() {
        Some(rpc) => AppError::CallReverted {
            message: rpc.message.clone(),
            data: rpc.data.as_ref().and_then(extract_revert_data),
        },
        None => AppError::ProviderError(err.to_string()),
    }
}

/// 不同节点实现把 revert data 放在不同位置：字符串，或嵌套的 {data: ...}
pub(crate) fn extract_revert_data(value: &Value) -> Option<Bytes> {
    match value {
        Value::String(s) => s.parse::<Bytes>().ok().filter(|b| !b.is_empty()),
        Value::Object(map) => map.get("data").and_then(extract_revert_data),
        _ => None,
    }
}

pub(crate) fn block_param(block: Option<BlockId>) -> Value {
    match block {
        Some(BlockId::Number(BlockNumber::Number(n))) => Value::String(format!("{:#x}", n)),
        Some(BlockId::Number(tag)) => serde_json::to_value(tag).unwrap_or(Value::from("latest")),
        Some(BlockId::Hash(hash)) => Value::String(format!("{:#x}", hash)),
        None => Value::from("latest"),
    }
}

pub(crate) async fn request_trace(
    provider: &Provider<Http>,
    tx: &TypedTransaction,
    block: Option<BlockId>,
) -> Result<Value, ProviderError> {
    let tx_json = serde_json::to_value(tx)?;
    provider
        .request::<_, Value>(
            "debug_traceCall",
            [tx_json, block_param(block), call_tracer_options()],
        )
        .await
}

/// trace 失败统一视为 Trace 错误（非致命）
pub(crate) fn trace_error(err: AppError) -> AppError {
    match err {
        AppError::CallReverted { message, .. } => AppError::Trace(message),
        AppError::Trace(m) => AppError::Trace(m),
        other => AppError::Trace(other.to_string()),
    }
}

pub(crate) fn estimation_error(err: AppError) -> AppError {
    match err {
        AppError::CallReverted { message, .. } => AppError::GasEstimation(message),
        other => other,
    }
}

#[async_trait]
impl ProviderTrait for EthereumProvider {
    async fn call(&self, tx: &TypedTransaction, block: Option<BlockId>) -> Result<Bytes, AppError> {
        self.get_provider()
            .call(tx, block)
            .await
            .map_err(classify_call_error)
    }

    async fn estimate_gas(
        &self,
        tx: &TypedTransaction,
        block: Option<BlockId>,
    ) -> Result<U256, AppError> {
        self.get_provider()
            .estimate_gas(tx, block)
            .await
            .map_err(|e| estimation_error(classify_call_error(e)))
    }

    async fn trace_call(
        &self,
        tx: &TypedTransaction,
        block: Option<BlockId>,
    ) -> Result<CallTrace, AppError> {
        let provider = self.get_provider();
        let raw = request_trace(&provider, tx, block)
            .await
            .map_err(|e| trace_error(classify_call_error(e)))?;
        parse_call_trace(raw)
    }
}
