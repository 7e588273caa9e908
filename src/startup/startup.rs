use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::errors::error::AppError;
use crate::infrastructure::provider::ethereum_provider::EthereumProvider;
use crate::infrastructure::provider::{ProviderTrait, RetryAdapter};
use crate::infrastructure::registry::ContractRegistry;
use crate::services::SimulationService;
use crate::services::simulation::ResultCache;
use crate::{log_info, log_warn};

/// 应用装配：注册表 + 各网络 Provider + 模拟服务
pub struct Application {
    pub service: Arc<SimulationService>,
    pub config: Config,
}

pub type Result<T> = std::result::Result<T, AppError>;

impl Application {
    pub fn build(config: Config) -> Result<Self> {
        let registry = Arc::new(ContractRegistry::with_defaults());
        if let Some(file) = &config.registry.contracts_file {
            let path = PathBuf::from(file);
            let n = registry.load_file(&path)?;
            log_info!("已从 {} 注册 {} 个合约", path.display(), n);
            if config.registry.watch {
                registry.watch_file(path)?;
            }
        }
        log_info!("合约注册表就绪，共 {} 个合约", registry.len());

        let cache = ResultCache::new(config.cache.ttl(), config.cache.capacity);
        let mut service = SimulationService::new(registry, config.simulation.clone(), cache);

        for (network, net) in config.networks() {
            let eth_provider = Arc::new(EthereumProvider::new(net)?);
            let provider = Arc::new(RetryAdapter::new(
                eth_provider,
                net.max_retries,
                net.base_delay(),
                net.request_timeout(),
            )) as Arc<dyn ProviderTrait>;
            service = service.with_provider(network, provider);
            log_info!("🔌 已接入网络 {} (chain_id={})", network, net.chain_id);
        }
        if service.networks().is_empty() {
            log_warn!("未配置任何网络，只能使用离线命令");
        }

        Ok(Self {
            service: Arc::new(service),
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use crate::models::domain::contract::Network;

    #[test]
    fn wires_configured_networks() {
        let mut config = Config::default();
        config.networks.insert(
            "sepolia".into(),
            NetworkConfig {
                rpc_url: "https://sepolia.example.org".into(),
                chain_id: 11155111,
                api_keys: String::new(),
                max_retries: 2,
                base_delay_ms: 10,
                request_timeout_secs: 5,
            },
        );
        let app = Application::build(config).unwrap();
        assert_eq!(app.service.networks(), vec![Network::Sepolia]);
        assert!(!app.service.registry().is_empty());
    }
}
