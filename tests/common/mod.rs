#![allow(dead_code)]

use async_trait::async_trait;
use ethers_core::abi::{Token, encode};
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, BlockId, Bytes, H256, U256};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tx_simulator::AppError;
use tx_simulator::config::SimulationConfig;
use tx_simulator::infrastructure::provider::{CallTrace, ProviderTrait, TraceLog};
use tx_simulator::infrastructure::registry::ContractRegistry;
use tx_simulator::models::domain::Network;
use tx_simulator::services::SimulationService;
use tx_simulator::services::simulation::ResultCache;

pub const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
pub const CALLER: &str = "0x28c6c06298d514db089934071355e5743bf21d60";
pub const RECIPIENT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

/// 单个调用的预设响应
#[derive(Clone)]
pub struct Script {
    pub call: Result<Bytes, AppError>,
    pub gas: Result<U256, AppError>,
    pub trace: Result<CallTrace, AppError>,
}

impl Script {
    /// 调用成功，返回 bool true
    pub fn ok(gas: u64) -> Self {
        Self {
            call: Ok(encode(&[Token::Bool(true)]).into()),
            gas: Ok(U256::from(gas)),
            trace: Err(AppError::Trace("method not found".into())),
        }
    }

    pub fn reverted(data: Vec<u8>) -> Self {
        Self {
            call: Err(AppError::CallReverted {
                message: "execution reverted".into(),
                data: Some(data.into()),
            }),
            gas: Err(AppError::GasEstimation("execution reverted".into())),
            trace: Err(AppError::Trace("execution reverted".into())),
        }
    }

    pub fn with_trace(mut self, trace: CallTrace) -> Self {
        self.trace = Ok(trace);
        self
    }
}

/// 按 call data 完整匹配，其次按选择器匹配
#[derive(Default)]
pub struct MockProvider {
    by_data: Mutex<HashMap<Vec<u8>, Script>>,
    by_selector: Mutex<HashMap<[u8; 4], Script>>,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
    pub estimates: AtomicUsize,
    pub traces: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_selector(self, selector: [u8; 4], script: Script) -> Self {
        self.by_selector
            .lock()
            .unwrap()
            .insert(selector, script);
        self
    }

    pub fn on_data(self, data: Vec<u8>, script: Script) -> Self {
        self.by_data.lock().unwrap().insert(data, script);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn script(&self, tx: &TypedTransaction) -> Script {
        let data = tx.data().map(|d| d.to_vec()).unwrap_or_default();
        if let Some(s) = self.by_data.lock().unwrap().get(&data) {
            return s.clone();
        }
        let selector: Option<[u8; 4]> = data.get(..4).and_then(|s| s.try_into().ok());
        selector
            .and_then(|s| self.by_selector.lock().unwrap().get(&s).cloned())
            .unwrap_or_else(|| Script::reverted(Vec::new()))
    }
}

#[async_trait]
impl ProviderTrait for MockProvider {
    async fn call(&self, tx: &TypedTransaction, _block: Option<BlockId>) -> Result<Bytes, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script(tx).call
    }

    async fn estimate_gas(
        &self,
        tx: &TypedTransaction,
        _block: Option<BlockId>,
    ) -> Result<U256, AppError> {
        self.estimates.fetch_add(1, Ordering::SeqCst);
        self.script(tx).gas
    }

    async fn trace_call(
        &self,
        tx: &TypedTransaction,
        _block: Option<BlockId>,
    ) -> Result<CallTrace, AppError> {
        self.traces.fetch_add(1, Ordering::SeqCst);
        self.script(tx).trace
    }
}

pub fn service(provider: Arc<MockProvider>, trace_enabled: bool) -> SimulationService {
    let settings = SimulationConfig {
        trace_enabled,
        ..SimulationConfig::default()
    };
    SimulationService::new(
        Arc::new(ContractRegistry::with_defaults()),
        settings,
        ResultCache::default(),
    )
    .with_provider(Network::Mainnet, provider)
}

pub fn address(s: &str) -> Address {
    s.parse().unwrap()
}

/// Transfer 日志
pub fn transfer_log(token: Address, from: Address, to: Address, raw_amount: u64) -> TraceLog {
    let topic = H256::from(ethers_core::utils::keccak256("Transfer(address,address,uint256)"));
    TraceLog {
        address: token,
        topics: vec![topic, H256::from(from), H256::from(to)],
        data: encode(&[Token::Uint(U256::from(raw_amount))]).into(),
    }
}

/// Error(string) revert data
pub fn error_string(reason: &str) -> Vec<u8> {
    let mut data = vec![0x08, 0xc3, 0x79, 0xa0];
    data.extend(encode(&[Token::String(reason.to_string())]));
    data
}
