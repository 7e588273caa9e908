// services/simulation/simulation_service.rs
//
// Validate -> Encode -> Call -> Decode/Error -> EstimateGas -> Trace -> Categorize
use super::cache::{ResultCache, fingerprint};
use super::error_decoder::{DecodedError, decode_error};
use super::gas_analyzer::{
    GasComparison, analyze_distribution, baseline_for, categorize, compare, cost_of,
};
use super::state_changes::extract_state_changes;
use super::validator::Validator;
use crate::config::SimulationConfig;
use crate::errors::error::AppError;
use crate::infrastructure::abi::{decode_output, encode_call, parse_address};
use crate::infrastructure::provider::ProviderTrait;
use crate::infrastructure::registry::ContractRegistry;
use crate::models::domain::contract::{ContractDescriptor, FunctionCategory, FunctionSignature, Network};
use crate::models::domain::request::{BatchRequest, ComparisonRequest, SimulationRequest};
use crate::models::domain::result::{BatchResult, ComparisonResult, SimulationResult};
use crate::utils::convert::u256_to_u64;
use crate::utils::format::format_gas;
use crate::{log_debug, log_info, log_warn};
use chrono::Utc;
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, Bytes, TransactionRequest, U256};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const GWEI: u64 = 1_000_000_000;

/// 已解析、已校验、已编码的调用
struct PreparedCall {
    contract: Arc<ContractDescriptor>,
    signature: FunctionSignature,
    provider: Arc<dyn ProviderTrait>,
    tx: TypedTransaction,
    warnings: Vec<String>,
}

/// 模拟调用的原始结果
enum CallOutcome {
    Returned(Bytes),
    Failed(AppError),
}

pub struct SimulationService {
    registry: Arc<ContractRegistry>,
    providers: HashMap<Network, Arc<dyn ProviderTrait>>,
    validator: Validator,
    cache: ResultCache,
    settings: SimulationConfig,
}

impl SimulationService {
    pub fn new(registry: Arc<ContractRegistry>, settings: SimulationConfig, cache: ResultCache) -> Self {
        Self {
            registry,
            providers: HashMap::new(),
            validator: Validator::new(),
            cache,
            settings,
        }
    }

    pub fn with_provider(mut self, network: Network, provider: Arc<dyn ProviderTrait>) -> Self {
        self.providers.insert(network, provider);
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn registry(&self) -> &Arc<ContractRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn networks(&self) -> Vec<Network> {
        let mut networks: Vec<_> = self.providers.keys().copied().collect();
        networks.sort();
        networks
    }

    /// 单次模拟
    ///
    /// 只有参数/编码/查找类错误以 Err 返回；节点拒绝、gas 估算、trace 等失败都体现在结果里。
    #[tracing::instrument(
        skip_all,
        fields(function = %request.function_name, network = %request.network, block = %request.block)
    )]
    pub async fn simulate(&self, request: &SimulationRequest) -> Result<SimulationResult, AppError> {
        let key = single_key(request);
        if let Some(hit) = self.cache.get_single(&key) {
            log_debug!("命中缓存: {}", key);
            return Ok(hit);
        }

        let prepared = self.prepare(request)?;
        log_info!(
            "🔍 模拟 {}.{} on {} (caller={}, block={})",
            prepared.contract.symbol,
            prepared.signature.name,
            request.network,
            request.caller,
            request.block
        );

        let block = Some(request.block.to_block_id());
        let outcome = match prepared.provider.call(&prepared.tx, block).await {
            Ok(bytes) => CallOutcome::Returned(bytes),
            Err(e) => CallOutcome::Failed(e),
        };
        // 传输层失败不缓存，下次重新请求
        let transient = matches!(
            &outcome,
            CallOutcome::Failed(AppError::ProviderError(_) | AppError::Timeout(_))
        );

        let result = self.complete(request, &prepared, outcome).await;
        log_info!(
            "✅ 模拟完成 {}: success={} hypothetical={} gas={}",
            prepared.signature.name,
            result.success,
            result.hypothetical_success,
            format_gas(result.gas_used)
        );

        if !transient {
            self.cache.put_single(key, result.clone());
        }
        Ok(result)
    }

    /// 带超时的模拟；超时后放弃整个请求（丢弃 future 即取消）
    pub async fn simulate_with_timeout(
        &self,
        request: &SimulationRequest,
        timeout: Option<Duration>,
    ) -> Result<SimulationResult, AppError> {
        let limit = timeout.unwrap_or(Duration::from_secs(self.settings.timeout_secs));
        tokio::time::timeout(limit, self.simulate(request))
            .await
            .map_err(|_| AppError::Timeout(limit.as_secs()))?
    }

    /// 同一函数多组参数对比，按顺序逐个执行
    pub async fn compare_variants(
        &self,
        request: &ComparisonRequest,
    ) -> Result<Vec<ComparisonResult>, AppError> {
        let key = fingerprint(
            "comparison",
            &operation_name(&request.contract, &request.function_name),
            &request.caller,
            &request.parameter_sets,
            request.network,
            &request.block,
        );
        if let Some(hit) = self.cache.get_comparison(&key) {
            return Ok(hit);
        }

        let mut variants = Vec::with_capacity(request.parameter_sets.len());
        for (i, args) in request.parameter_sets.iter().enumerate() {
            let sim = SimulationRequest::new(
                request.network,
                &request.contract,
                &request.function_name,
                &request.caller,
                args.clone(),
            )
            .at_block(request.block);
            let result = self.simulate_or_fail(sim).await.0;
            variants.push(ComparisonResult {
                variant: format!("Variant {}", i + 1),
                parameters: args.clone(),
                result,
                relative_gas_cost: None,
            });
        }

        fill_relative_cost(&mut variants);
        self.cache
            .put_comparison(key, request.network, variants.clone());
        Ok(variants)
    }

    /// 批量模拟，按顺序逐个执行；单个操作的错误不会中断整批
    pub async fn simulate_batch(&self, request: &BatchRequest) -> Result<BatchResult, AppError> {
        let key = fingerprint(
            "batch",
            "batch",
            &request.caller,
            &request.operations,
            request.network,
            &request.block,
        );
        if let Some(hit) = self.cache.get_batch(&key) {
            return Ok(hit);
        }

        let mut operations = Vec::with_capacity(request.operations.len());
        let mut batch_success = true;
        for (i, op) in request.operations.iter().enumerate() {
            let mut sim = SimulationRequest::new(
                request.network,
                &op.contract,
                &op.function_name,
                &request.caller,
                op.args.clone(),
            )
            .at_block(request.block);
            sim.value = op.value;
            sim.gas_limit = op.gas_limit;

            let (result, hard_failed) = self.simulate_or_fail(sim).await;
            if hard_failed {
                log_warn!("批量操作 #{} ({}) 执行失败", i + 1, op.function_name);
                batch_success = false;
            }
            operations.push(result);
        }

        let usable: Vec<&SimulationResult> = operations.iter().filter(|r| r.is_usable()).collect();
        let total_gas = usable.iter().map(|r| r.gas_used).sum();
        let successful_operations = usable.len();
        let total_operations = operations.len();
        let success_rate = if total_operations == 0 {
            0.0
        } else {
            successful_operations as f64 / total_operations as f64 * 100.0
        };

        let batch = BatchResult {
            gas_distribution: analyze_distribution(&operations),
            operations,
            total_gas,
            successful_operations,
            total_operations,
            success_rate,
            batch_success,
            timestamp: Utc::now(),
        };
        log_info!(
            "📦 批量模拟完成: {}/{} 成功, 总 gas {}",
            successful_operations,
            total_operations,
            format_gas(total_gas)
        );
        self.cache.put_batch(key, request.network, batch.clone());
        Ok(batch)
    }

    /// 对比结果的 gas 统计与建议
    pub fn compare_gas(&self, results: &[SimulationResult]) -> GasComparison {
        compare(results)
    }

    /// 把 simulate 的 Err 转成失败结果；第二个值表示是否硬失败
    async fn simulate_or_fail(&self, request: SimulationRequest) -> (SimulationResult, bool) {
        match self.simulate(&request).await {
            Ok(result) => (result, false),
            Err(e) => {
                log_warn!("模拟 {} 失败: {}", request.function_name, e);
                let category = self.category_of(&request);
                let mut failed = SimulationResult::failed(request, category, decode_error(&e));
                if let AppError::InvalidParameters(reasons) = &e {
                    failed.warnings = reasons.clone();
                }
                (failed, e.is_blocking())
            }
        }
    }

    fn category_of(&self, request: &SimulationRequest) -> FunctionCategory {
        self.registry
            .lookup(&request.contract, request.network)
            .and_then(|c| c.function(&request.function_name).map(|f| f.category))
            .unwrap_or(FunctionCategory::Other)
    }

    /// Validate + Encode：全部是阻断错误
    fn prepare(&self, request: &SimulationRequest) -> Result<PreparedCall, AppError> {
        let provider = self
            .providers
            .get(&request.network)
            .cloned()
            .ok_or_else(|| AppError::UnsupportedNetwork(request.network.to_string()))?;
        let contract = self
            .registry
            .lookup(&request.contract, request.network)
            .ok_or_else(|| AppError::UnknownContract {
                address: request.contract.clone(),
                network: request.network.to_string(),
            })?;
        let signature = contract
            .function(&request.function_name)
            .cloned()
            .ok_or_else(|| AppError::UnknownFunction {
                contract: contract.symbol.clone(),
                function: request.function_name.clone(),
            })?;

        let mut outcome = self
            .validator
            .validate(&signature, &request.args, contract.decimals);
        let caller = match parse_address(&request.caller) {
            Ok(a) => Some(a),
            Err(e) => {
                outcome.errors.insert(0, format!("caller: {}", e));
                None
            }
        };
        let caller = match caller {
            Some(c) if outcome.is_valid() => c,
            _ => return Err(AppError::InvalidParameters(outcome.errors)),
        };

        if request.value.is_some_and(|v| !v.is_zero()) && !signature.mutability.is_payable() {
            outcome
                .warnings
                .push(format!("value sent to non-payable function {}", signature.name));
        }

        let data = encode_call(&signature, &request.args, contract.decimals)?;
        let tx = build_transaction(caller, contract.address, data, request);

        Ok(PreparedCall {
            contract,
            signature,
            provider,
            tx,
            warnings: outcome.warnings,
        })
    }

    /// Decode/Error -> EstimateGas -> Trace -> Categorize，不再返回错误
    async fn complete(
        &self,
        request: &SimulationRequest,
        prepared: &PreparedCall,
        outcome: CallOutcome,
    ) -> SimulationResult {
        let contract = &prepared.contract;
        let signature = &prepared.signature;
        let block = Some(request.block.to_block_id());

        let (success, output, error): (bool, _, Option<DecodedError>) = match outcome {
            CallOutcome::Returned(bytes) => (
                true,
                Some(decode_output(signature, &bytes, contract.decimals)),
                None,
            ),
            CallOutcome::Failed(e) => {
                log_debug!("模拟调用失败: {}", e);
                (false, None, Some(decode_error(&e)))
            }
        };
        let hypothetical_success = error.as_ref().is_some_and(|e| e.is_hypothetical_success());

        let mut result = SimulationResult {
            success,
            hypothetical_success,
            gas_used: 0,
            gas_category: None,
            operation_category: signature.category,
            output,
            error,
            state_changes: Vec::new(),
            internal_calls: Vec::new(),
            warnings: prepared.warnings.clone(),
            cost: None,
            timestamp: Utc::now(),
            request: request.clone(),
        };
        if !result.is_usable() {
            return result;
        }

        let estimated = prepared
            .provider
            .estimate_gas(&prepared.tx, block)
            .await
            .and_then(u256_to_u64);
        result.gas_used = match estimated {
            Ok(gas) => gas,
            Err(e) => {
                let fallback = baseline_for(&signature.name);
                log_debug!("gas 估算失败，使用基准值 {}: {}", fallback, e);
                fallback
            }
        };

        if self.settings.trace_enabled {
            match prepared.provider.trace_call(&prepared.tx, block).await {
                Ok(trace) => {
                    if success && trace.gas_used > 0 {
                        result.gas_used = trace.gas_used;
                    }
                    result.state_changes = extract_state_changes(&trace.logs, contract);
                    result.internal_calls = trace.calls;
                }
                Err(e) => log_debug!("trace 不可用，跳过: {}", e),
            }
        }

        result.gas_category = Some(categorize(&signature.name, result.gas_used));
        let gas_price = request
            .gas_price
            .unwrap_or_else(|| U256::from(self.settings.default_gas_price_gwei) * U256::from(GWEI));
        result.cost = Some(cost_of(
            result.gas_used,
            gas_price,
            self.settings.reference_price_usd,
        ));
        result
    }
}

fn operation_name(contract: &str, function: &str) -> String {
    format!("{}.{}", contract.trim().to_lowercase(), function)
}

fn single_key(request: &SimulationRequest) -> String {
    let args = json!({
        "args": request.args,
        "value": request.value,
        "gas_limit": request.gas_limit,
        "gas_price": request.gas_price,
    });
    fingerprint(
        "single",
        &operation_name(&request.contract, &request.function_name),
        &request.caller,
        &args,
        request.network,
        &request.block,
    )
}

fn build_transaction(
    from: Address,
    to: Address,
    data: Bytes,
    request: &SimulationRequest,
) -> TypedTransaction {
    let mut tx = TransactionRequest::new().from(from).to(to).data(data);
    if let Some(value) = request.value {
        tx = tx.value(value);
    }
    if let Some(gas) = request.gas_limit {
        tx = tx.gas(gas);
    }
    if let Some(price) = request.gas_price {
        tx = tx.gas_price(price);
    }
    tx.into()
}

/// 可用结果不少于两个时，按 gas / 最小 gas 回填相对成本；失败变体记 0
fn fill_relative_cost(variants: &mut [ComparisonResult]) {
    let usable_gas: Vec<u64> = variants
        .iter()
        .filter(|v| v.result.is_usable())
        .map(|v| v.result.gas_used)
        .collect();
    let Some(min) = usable_gas.iter().copied().filter(|g| *g > 0).min() else {
        return;
    };
    if usable_gas.len() < 2 {
        return;
    }
    for v in variants.iter_mut() {
        v.relative_gas_cost = Some(if v.result.is_usable() {
            v.result.gas_used as f64 / min as f64
        } else {
            0.0
        });
    }
}
