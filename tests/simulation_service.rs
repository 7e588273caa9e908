mod common;

use common::*;
use ethers_core::types::U256;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tx_simulator::AppError;
use tx_simulator::infrastructure::abi::{DecodedValue, encode_call};
use tx_simulator::infrastructure::provider::CallTrace;
use tx_simulator::infrastructure::registry::ContractRegistry;
use tx_simulator::models::domain::{
    BatchOperation, BatchRequest, ComparisonRequest, FunctionCategory, Network, ParamValue,
    SimulationRequest, StateChange,
};
use tx_simulator::services::simulation::{GasEfficiency, Severity};

const TRANSFER: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
const APPROVE: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

fn transfer_request(amount: &str) -> SimulationRequest {
    SimulationRequest::new(
        Network::Mainnet,
        USDC,
        "transfer",
        CALLER,
        vec![ParamValue::address(RECIPIENT), ParamValue::uint(amount)],
    )
}

fn transfer_calldata(amount: &str) -> Vec<u8> {
    let registry = ContractRegistry::with_defaults();
    let usdc = registry.lookup(USDC, Network::Mainnet).unwrap();
    let args = vec![ParamValue::address(RECIPIENT), ParamValue::uint(amount)];
    encode_call(usdc.function("transfer").unwrap(), &args, usdc.decimals)
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn successful_transfer_uses_trace_gas_and_logs() {
    let token = address(USDC);
    let trace = CallTrace {
        gas_used: 51_000,
        calls: vec![],
        logs: vec![transfer_log(token, address(CALLER), address(RECIPIENT), 25_500_000)],
    };
    let provider = Arc::new(
        MockProvider::new().on_selector(TRANSFER, Script::ok(52_000).with_trace(trace)),
    );
    let service = service(provider.clone(), true);

    let result = service.simulate(&transfer_request("25.5")).await.unwrap();

    assert!(result.success);
    assert!(!result.hypothetical_success);
    assert_eq!(result.gas_used, 51_000);
    assert_eq!(result.gas_category, Some(GasEfficiency::Efficient));
    assert_eq!(result.operation_category, FunctionCategory::Transfer);
    assert_eq!(result.output, Some(DecodedValue::Bool(true)));
    assert_eq!(
        result.state_changes,
        vec![StateChange::Transfer {
            token,
            from: address(CALLER),
            to: address(RECIPIENT),
            amount: "25.5".into(),
        }]
    );
    assert!(result.cost.is_some());
    assert!(result.error.is_none());
}

#[tokio::test]
async fn insufficient_balance_is_hypothetical_success_with_baseline_gas() {
    let revert = error_string("ERC20: transfer amount exceeds balance");
    let provider = Arc::new(MockProvider::new().on_selector(TRANSFER, Script::reverted(revert)));
    let service = service(provider.clone(), true);

    let result = service.simulate(&transfer_request("1000")).await.unwrap();

    assert!(!result.success);
    assert!(result.hypothetical_success);
    assert!(result.is_usable());
    // gas 估算失败，退回 transfer 的基准值
    assert_eq!(result.gas_used, 51_000);
    assert_eq!(result.gas_category, Some(GasEfficiency::Efficient));
    let error = result.error.unwrap();
    assert_eq!(error.message, "ERC20: transfer amount exceeds balance");
    assert_eq!(error.severity, Severity::High);
    assert!(result.state_changes.is_empty());
}

#[tokio::test]
async fn unrelated_revert_is_a_plain_failure() {
    let revert = error_string("Ownable: caller is not the owner");
    let provider = Arc::new(MockProvider::new().on_selector(TRANSFER, Script::reverted(revert)));
    let service = service(provider.clone(), true);

    let result = service.simulate(&transfer_request("1")).await.unwrap();

    assert!(!result.is_usable());
    assert_eq!(result.gas_used, 0);
    assert!(result.gas_category.is_none());
    // 不可用结果不再估算 gas
    assert_eq!(provider.estimates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_trace_support_degrades_gracefully() {
    let provider = Arc::new(MockProvider::new().on_selector(TRANSFER, Script::ok(48_000)));
    let service = service(provider.clone(), true);

    let result = service.simulate(&transfer_request("2")).await.unwrap();

    assert!(result.success);
    assert_eq!(result.gas_used, 48_000);
    assert!(result.state_changes.is_empty());
    assert!(result.internal_calls.is_empty());
    assert_eq!(provider.traces.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn validation_errors_block_before_any_network_call() {
    let provider = Arc::new(MockProvider::new().on_selector(TRANSFER, Script::ok(50_000)));
    let service = service(provider.clone(), true);

    let bad = SimulationRequest::new(
        Network::Mainnet,
        USDC,
        "transfer",
        CALLER,
        vec![ParamValue::address("0x1234"), ParamValue::uint("1")],
    );
    let err = service.simulate(&bad).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidParameters(ref reasons) if reasons.len() == 1));

    let bad_caller = SimulationRequest {
        caller: "nobody".into(),
        ..transfer_request("1")
    };
    assert!(matches!(
        service.simulate(&bad_caller).await,
        Err(AppError::InvalidParameters(_))
    ));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn lookup_failures_are_blocking() {
    let service = service(Arc::new(MockProvider::new()), true);

    let unknown_contract = SimulationRequest {
        contract: "0x0000000000000000000000000000000000000abc".into(),
        ..transfer_request("1")
    };
    assert!(matches!(
        service.simulate(&unknown_contract).await,
        Err(AppError::UnknownContract { .. })
    ));

    let unknown_function = SimulationRequest {
        function_name: "rebase".into(),
        ..transfer_request("1")
    };
    assert!(matches!(
        service.simulate(&unknown_function).await,
        Err(AppError::UnknownFunction { .. })
    ));

    let other_network = SimulationRequest {
        network: Network::Sepolia,
        ..transfer_request("1")
    };
    assert!(matches!(
        service.simulate(&other_network).await,
        Err(AppError::UnsupportedNetwork(_))
    ));
}

#[tokio::test]
async fn repeated_requests_are_served_from_cache() {
    let provider = Arc::new(MockProvider::new().on_selector(TRANSFER, Script::ok(50_000)));
    let service = service(provider.clone(), false);

    let first = service.simulate(&transfer_request("3")).await.unwrap();
    let second = service.simulate(&transfer_request("3")).await.unwrap();
    assert_eq!(provider.call_count(), 1);
    assert_eq!(first.timestamp, second.timestamp);

    service.simulate(&transfer_request("4")).await.unwrap();
    assert_eq!(provider.call_count(), 2);

    service.cache().clear_for_network(Network::Mainnet);
    service.simulate(&transfer_request("3")).await.unwrap();
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test]
async fn transport_failures_are_not_cached() {
    let mut script = Script::ok(50_000);
    script.call = Err(AppError::ProviderError("connection refused".into()));
    let provider = Arc::new(MockProvider::new().on_selector(TRANSFER, script));
    let service = service(provider.clone(), false);

    let result = service.simulate(&transfer_request("1")).await.unwrap();
    assert!(!result.is_usable());
    service.simulate(&transfer_request("1")).await.unwrap();
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn batch_continues_past_a_hard_failure() {
    let provider = Arc::new(
        MockProvider::new()
            .on_selector(TRANSFER, Script::ok(50_000))
            .on_selector(APPROVE, Script::ok(46_000)),
    );
    let service = service(provider.clone(), false);

    let op = |function: &str, args: Vec<ParamValue>| BatchOperation {
        contract: USDC.into(),
        function_name: function.into(),
        args,
        value: None,
        gas_limit: None,
    };
    let request = BatchRequest {
        caller: CALLER.into(),
        network: Network::Mainnet,
        block: Default::default(),
        operations: vec![
            op("transfer", vec![ParamValue::address(RECIPIENT), ParamValue::uint("1")]),
            op("transfer", vec![ParamValue::address(RECIPIENT), ParamValue::uint("abc")]),
            op("approve", vec![ParamValue::address(RECIPIENT), ParamValue::uint("5")]),
        ],
    };

    let batch = service.simulate_batch(&request).await.unwrap();

    assert!(!batch.batch_success);
    assert_eq!(batch.total_operations, 3);
    assert_eq!(batch.successful_operations, 2);
    assert!((batch.success_rate - 66.67).abs() < 0.01);
    assert_eq!(batch.total_gas, 96_000);

    let names: Vec<_> = batch.operations.iter().map(|r| r.function_name()).collect();
    assert_eq!(names, vec!["transfer", "transfer", "approve"]);
    assert!(batch.operations[0].success);
    assert!(!batch.operations[1].is_usable());
    assert!(batch.operations[2].success);
    assert_eq!(batch.gas_distribution.len(), 2);
}

#[tokio::test]
async fn comparison_back_fills_relative_gas_cost() {
    let provider = Arc::new(
        MockProvider::new()
            .on_data(transfer_calldata("1"), Script::ok(50_000))
            .on_data(transfer_calldata("2"), Script::ok(100_000)),
    );
    let service = service(provider.clone(), false);

    let request = ComparisonRequest {
        contract: USDC.into(),
        function_name: "transfer".into(),
        caller: CALLER.into(),
        network: Network::Mainnet,
        block: Default::default(),
        parameter_sets: vec![
            vec![ParamValue::address(RECIPIENT), ParamValue::uint("1")],
            vec![ParamValue::address(RECIPIENT), ParamValue::uint("2")],
        ],
    };

    let variants = service.compare_variants(&request).await.unwrap();
    assert_eq!(variants.len(), 2);
    assert_eq!(variants[0].variant, "Variant 1");
    assert_eq!(variants[0].relative_gas_cost, Some(1.0));
    assert_eq!(variants[1].relative_gas_cost, Some(2.0));

    let results: Vec<_> = variants.iter().map(|v| v.result.clone()).collect();
    let summary = service.compare_gas(&results);
    assert_eq!(summary.most_efficient.unwrap().index, 0);
    assert_eq!(summary.range, 50_000);

    // 第二次直接命中对比缓存
    service.compare_variants(&request).await.unwrap();
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn slow_node_hits_the_overall_timeout() {
    let provider = Arc::new(
        MockProvider::new()
            .on_selector(TRANSFER, Script::ok(50_000))
            .with_delay(Duration::from_secs(30)),
    );
    let service = service(provider.clone(), false);

    let err = service
        .simulate_with_timeout(&transfer_request("1"), Some(Duration::from_secs(5)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Timeout(5)));
}

#[tokio::test]
async fn payable_value_on_non_payable_function_is_a_warning() {
    let provider = Arc::new(MockProvider::new().on_selector(TRANSFER, Script::ok(50_000)));
    let service = service(provider, false);

    let request = transfer_request("1").with_value(U256::from(1u64));
    let result = service.simulate(&request).await.unwrap();
    assert!(result.success);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("non-payable"));
}
