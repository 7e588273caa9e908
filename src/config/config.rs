use crate::models::domain::contract::Network;
use config::{ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// 网络名 -> RPC 配置，网络名需能解析为 Network
    #[serde(default)]
    pub networks: HashMap<String, NetworkConfig>,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// 单个网络的 RPC 接入配置
#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// 逗号分隔；为空时直接使用 rpc_url
    #[serde(default)]
    pub api_keys: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulationConfig {
    /// 是否调用 debug_traceCall 获取内部调用与日志
    #[serde(default = "default_true")]
    pub trace_enabled: bool,
    /// 原生币参考价格（美元），用于成本估算
    #[serde(default = "default_reference_price")]
    pub reference_price_usd: f64,
    /// 请求未指定 gas price 时使用
    #[serde(default = "default_gas_price_gwei")]
    pub default_gas_price_gwei: u64,
    /// simulate_with_timeout 的默认超时
    #[serde(default = "default_simulation_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RegistryConfig {
    /// 额外合约定义文件（TOML）
    pub contracts_file: Option<String>,
    #[serde(default)]
    pub watch: bool,
}

fn default_true() -> bool {
    true
}
fn default_max_retries() -> usize {
    3
}
fn default_base_delay_ms() -> u64 {
    500
}
fn default_request_timeout_secs() -> u64 {
    15
}
fn default_reference_price() -> f64 {
    2000.0
}
fn default_gas_price_gwei() -> u64 {
    20
}
fn default_simulation_timeout_secs() -> u64 {
    60
}
fn default_ttl_secs() -> u64 {
    300
}
fn default_capacity() -> usize {
    100
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            trace_enabled: default_true(),
            reference_price_usd: default_reference_price(),
            default_gas_price_gwei: default_gas_price_gwei(),
            timeout_secs: default_simulation_timeout_secs(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            capacity: default_capacity(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl NetworkConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// 加载顺序：config/default -> config/{APP_ENVIRONMENT} -> APP__* 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        config::Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// 已配置且名称合法的网络
    pub fn networks(&self) -> Vec<(Network, &NetworkConfig)> {
        let mut networks: Vec<_> = self
            .networks
            .iter()
            .filter_map(|(name, cfg)| match Network::from_str(name) {
                Ok(n) => Some((n, cfg)),
                Err(e) => {
                    crate::log_warn!("忽略网络配置 [{}]: {}", name, e);
                    None
                }
            })
            .collect();
        networks.sort_by_key(|(n, _)| *n);
        networks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_network_tables_with_defaults() {
        let raw = r#"
[networks.mainnet]
rpc_url = "https://eth.example.org"
chain_id = 1

[networks.atlantis]
rpc_url = "https://nowhere.example.org"
chain_id = 999

[cache]
ttl_secs = 60
"#;
        let config: Config = config::Config::builder()
            .add_source(File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        let networks = config.networks();
        assert_eq!(networks.len(), 1);
        assert_eq!(networks[0].0, Network::Mainnet);
        assert_eq!(networks[0].1.max_retries, 3);
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.cache.capacity, 100);
        assert!(config.simulation.trace_enabled);
    }
}
