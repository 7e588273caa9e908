use super::ethereum_provider::{
    EthereumProvider, ProviderTrait, classify_call_error, estimation_error, is_node_rejection,
    request_trace, trace_error,
};
use super::trace::{CallTrace, parse_call_trace};
use crate::errors::error::AppError;
use crate::log_warn;
use async_trait::async_trait;
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{BlockId, Bytes, U256};
use ethers_providers::{Http, Middleware, Provider, ProviderError};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// 在 EthereumProvider 之上增加超时与指数退避重试
///
/// 只重试传输层错误（连接失败、超时、限流），节点明确返回的错误（revert 等）直接上抛。
pub struct RetryAdapter {
    provider: Arc<EthereumProvider>,
    max_retries: usize,
    base_delay: Duration,
    request_timeout: Duration,
}

enum Attempt {
    Failed(ProviderError),
    TimedOut,
}

impl RetryAdapter {
    pub fn new(
        provider: Arc<EthereumProvider>,
        max_retries: usize,
        base_delay: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            max_retries: max_retries.max(1),
            base_delay,
            request_timeout,
        }
    }

    async fn retry_call<T, Fut, F>(&self, mut f: F) -> Result<T, AppError>
    where
        F: FnMut(Arc<Provider<Http>>) -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, ProviderError>> + Send,
    {
        let mut last_error: Option<Attempt> = None;
        for attempt in 0..self.max_retries {
            if attempt > 0 {
                // 指数倍数最高 2^10
                let exponent = (attempt - 1).min(10);
                let delay_ms = self.base_delay.as_millis() as u64 * (1u64 << exponent);
                // 0~10% 随机抖动，避免重试请求同时打到节点
                let jitter = rand::thread_rng().gen_range(0..=(delay_ms / 10 + 1));
                let final_delay = Duration::from_millis(delay_ms + jitter);

                log_warn!(
                    "RPC 尝试失败，正在进行第 {} 次重试，等待 {:?}...",
                    attempt + 1,
                    final_delay
                );
                sleep(final_delay).await;
            }

            let p = self.provider.get_provider();
            match timeout(self.request_timeout, f(p)).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) if is_node_rejection(&e) => return Err(classify_call_error(e)),
                Ok(Err(e)) => {
                    log_warn!("RPC 调用失败 (第 {} 次): {}", attempt + 1, e);
                    last_error = Some(Attempt::Failed(e));
                }
                Err(_) => {
                    log_warn!(
                        "RPC 调用超时 (第 {} 次): {:?}",
                        attempt + 1,
                        self.request_timeout
                    );
                    last_error = Some(Attempt::TimedOut);
                }
            }
        }

        match last_error {
            Some(Attempt::TimedOut) => Err(AppError::Timeout(self.request_timeout.as_secs())),
            Some(Attempt::Failed(e)) => Err(AppError::ProviderError(format!(
                "重试 {} 次失败，最后错误: {}",
                self.max_retries, e
            ))),
            None => Err(AppError::new("RPC 未执行任何尝试")),
        }
    }
}

#[async_trait]
impl ProviderTrait for RetryAdapter {
    async fn call(&self, tx: &TypedTransaction, block: Option<BlockId>) -> Result<Bytes, AppError> {
        self.retry_call(move |p| async move { p.call(tx, block).await })
            .await
    }

    async fn estimate_gas(
        &self,
        tx: &TypedTransaction,
        block: Option<BlockId>,
    ) -> Result<U256, AppError> {
        self.retry_call(move |p| async move { p.estimate_gas(tx, block).await })
            .await
            .map_err(estimation_error)
    }

    async fn trace_call(
        &self,
        tx: &TypedTransaction,
        block: Option<BlockId>,
    ) -> Result<CallTrace, AppError> {
        let raw = self
            .retry_call(move |p| async move { request_trace(&p, tx, block).await })
            .await
            .map_err(trace_error)?;
        parse_call_trace(raw)
    }
}
