use crate::errors::error::AppError;
use crate::infrastructure::abi::parse_address;
use crate::infrastructure::registry::seed::{self, Template};
use crate::models::domain::contract::{ContractDescriptor, ContractType, Network};
use crate::{log_error, log_info, log_warn};
use arc_swap::ArcSwap;
use notify::{Config as NotifyConfig, RecursiveMode, Watcher};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 超过该精度时 10^decimals 无法用 uint256 表示金额
pub const MAX_DECIMALS: u8 = 76;

type RegistryKey = (Network, String);
type RegistryTable = HashMap<RegistryKey, Arc<ContractDescriptor>>;

/// 合约注册表：(network, 小写地址) -> 描述符
///
/// 读多写少，使用 ArcSwap 存储当前快照，读取无锁，注册时整体替换。
pub struct ContractRegistry {
    table: ArcSwap<RegistryTable>,
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    contracts: Vec<RegistryEntry>,
}

#[derive(Debug, Deserialize)]
struct RegistryEntry {
    network: String,
    address: String,
    symbol: String,
    decimals: u8,
    #[serde(rename = "type", default = "default_contract_type")]
    contract_type: ContractType,
    template: Template,
}

fn default_contract_type() -> ContractType {
    ContractType::Fungible
}

fn normalize_address(address: &str) -> String {
    let lower = address.trim().to_lowercase();
    if lower.starts_with("0x") {
        lower
    } else {
        format!("0x{}", lower)
    }
}

impl Default for ContractRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractRegistry {
    /// 空注册表（测试隔离用）
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// 带内置种子数据的注册表
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        for descriptor in seed::default_descriptors() {
            registry.register(descriptor);
        }
        registry
    }

    /// 注册描述符，重复注册直接覆盖
    pub fn register(&self, descriptor: ContractDescriptor) {
        let key = (
            descriptor.network,
            normalize_address(&format!("{:#x}", descriptor.address)),
        );
        let descriptor = Arc::new(descriptor);
        self.table.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(key.clone(), descriptor.clone());
            next
        });
    }

    /// 地址大小写不敏感
    pub fn lookup(&self, address: &str, network: Network) -> Option<Arc<ContractDescriptor>> {
        self.table
            .load()
            .get(&(network, normalize_address(address)))
            .cloned()
    }

    /// 指定类型的所有合约，按 (network, symbol) 排序
    pub fn all_of_type(
        &self,
        contract_type: ContractType,
        network: Option<Network>,
    ) -> Vec<Arc<ContractDescriptor>> {
        let mut found: Vec<_> = self
            .table
            .load()
            .values()
            .filter(|d| d.contract_type == contract_type)
            .filter(|d| network.map_or(true, |n| d.network == n))
            .cloned()
            .collect();
        found.sort_by(|a, b| (a.network, &a.symbol).cmp(&(b.network, &b.symbol)));
        found
    }

    pub fn all(&self) -> Vec<Arc<ContractDescriptor>> {
        let mut all: Vec<_> = self.table.load().values().cloned().collect();
        all.sort_by(|a, b| (a.network, &a.symbol).cmp(&(b.network, &b.symbol)));
        all
    }

    pub fn len(&self) -> usize {
        self.table.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 从 TOML 文件注册额外的合约，返回注册数量
    pub fn load_file(&self, path: &Path) -> Result<usize, AppError> {
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("无法读取合约文件 '{}': {}", path.display(), e))
        })?;
        let file: RegistryFile = toml::from_str(&content)?;

        let mut registered = 0;
        for entry in file.contracts {
            let network = match entry.network.parse::<Network>() {
                Ok(n) => n,
                Err(e) => {
                    log_warn!("跳过合约 {}: {}", entry.symbol, e);
                    continue;
                }
            };
            if entry.decimals > MAX_DECIMALS {
                log_warn!(
                    "跳过合约 {}: decimals {} 超过上限 {}",
                    entry.symbol,
                    entry.decimals,
                    MAX_DECIMALS
                );
                continue;
            }
            let address = match parse_address(&entry.address) {
                Ok(a) => a,
                Err(e) => {
                    log_warn!("跳过合约 {}: {}", entry.symbol, e);
                    continue;
                }
            };
            self.register(seed::from_template(
                entry.template,
                network,
                address,
                &entry.symbol,
                entry.decimals,
                entry.contract_type,
            ));
            registered += 1;
        }
        Ok(registered)
    }

    /// 监听合约文件变化，变化时重新注册（后台线程）
    pub fn watch_file(self: &Arc<Self>, path: PathBuf) -> Result<(), AppError> {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut watcher = notify::RecommendedWatcher::new(tx, NotifyConfig::default())?;
        watcher.watch(&path, RecursiveMode::NonRecursive)?;
        log_info!("🚀 已启动合约文件热重载监听: {}", path.display());

        let registry = Arc::clone(self);
        std::thread::spawn(move || {
            // watcher 被 drop 后监听即停止，这里持有到线程结束
            let _watcher = watcher;
            for res in rx {
                match res {
                    Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                        match registry.load_file(&path) {
                            Ok(n) => log_info!("🔄 合约文件已重新加载，注册 {} 个合约", n),
                            Err(e) => log_error!("合约文件重新加载失败: {}", e),
                        }
                    }
                    Ok(_) => {}
                    Err(e) => log_error!("watch error: {:?}", e),
                }
            }
        });
        Ok(())
    }
}
