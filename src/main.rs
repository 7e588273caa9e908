use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tx_simulator::config::Config;
use tx_simulator::domain::{
    BatchRequest, ComparisonRequest, ContractType, Network, SimulationRequest,
};
use tx_simulator::infrastructure::abi::decode_arguments;
use tx_simulator::infrastructure::registry::ContractRegistry;
use tx_simulator::services::simulation::error_decoder::decode_input;
use tx_simulator::startup::Application;
use tx_simulator::utils::logger::init_logger;
use tx_simulator::{log_info, AppError};

#[derive(Parser, Debug)]
#[command(name = "tx-simulator", version, about = "Simulate and analyse token contract calls")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 单次模拟（请求 JSON 文件）
    Simulate {
        file: PathBuf,
        /// 整体超时（秒）
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// 同一函数多组参数对比
    Compare { file: PathBuf },
    /// 批量模拟
    Batch { file: PathBuf },
    /// 列出已注册合约
    Contracts {
        #[arg(long)]
        network: Option<String>,
        /// fungible / non_fungible / custom
        #[arg(long = "type")]
        contract_type: Option<String>,
    },
    /// 解码 revert data 或节点错误信息
    DecodeError { input: String },
    /// 按合约函数表解码 call data
    Decode {
        #[arg(long)]
        contract: String,
        #[arg(long, default_value = "mainnet")]
        network: String,
        data: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logger();

    let cli = Cli::parse();
    match cli.command {
        Commands::Simulate { file, timeout } => {
            let request: SimulationRequest = read_json(&file)?;
            let app = build_app()?;
            let result = app
                .service
                .simulate_with_timeout(&request, timeout.map(Duration::from_secs))
                .await?;
            print_json(&result)
        }
        Commands::Compare { file } => {
            let request: ComparisonRequest = read_json(&file)?;
            let app = build_app()?;
            let variants = app.service.compare_variants(&request).await?;
            let results: Vec<_> = variants.iter().map(|v| v.result.clone()).collect();
            let summary = app.service.compare_gas(&results);
            print_json(&serde_json::json!({ "variants": variants, "summary": summary }))
        }
        Commands::Batch { file } => {
            let request: BatchRequest = read_json(&file)?;
            let app = build_app()?;
            let batch = app.service.simulate_batch(&request).await?;
            print_json(&batch)
        }
        Commands::Contracts {
            network,
            contract_type,
        } => {
            let registry = registry_from_config()?;
            let network = network.map(|n| n.parse::<Network>()).transpose()?;
            let contracts = match contract_type {
                Some(t) => {
                    let t: ContractType = serde_json::from_value(serde_json::Value::String(t))
                        .context("unknown contract type")?;
                    registry.all_of_type(t, network)
                }
                None => registry
                    .all()
                    .into_iter()
                    .filter(|c| network.map_or(true, |n| c.network == n))
                    .collect(),
            };
            let listing: Vec<_> = contracts
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "network": c.network,
                        "address": format!("{:#x}", c.address),
                        "symbol": c.symbol,
                        "decimals": c.decimals,
                        "type": c.contract_type,
                        "functions": c.functions.values().map(|f| f.canonical()).collect::<Vec<_>>(),
                    })
                })
                .collect();
            print_json(&listing)
        }
        Commands::DecodeError { input } => print_json(&decode_input(&input)),
        Commands::Decode {
            contract,
            network,
            data,
        } => {
            let registry = registry_from_config()?;
            let network: Network = network.parse()?;
            let descriptor = registry
                .lookup(&contract, network)
                .ok_or_else(|| AppError::UnknownContract {
                    address: contract.clone(),
                    network: network.to_string(),
                })?;
            let bytes = hex::decode(data.trim().trim_start_matches("0x"))
                .context("call data is not valid hex")?;
            let selector = bytes.get(..4).context("call data shorter than a selector")?;
            let signature = descriptor
                .functions
                .values()
                .find(|f| f.selector[..] == *selector)
                .ok_or_else(|| AppError::UnknownFunction {
                    contract: descriptor.symbol.clone(),
                    function: format!("0x{}", hex::encode(selector)),
                })?;
            let args = decode_arguments(signature, &bytes, descriptor.decimals)?;
            print_json(&serde_json::json!({
                "function": signature.canonical(),
                "arguments": args,
            }))
        }
    }
}

fn build_app() -> anyhow::Result<Application> {
    let config = Config::load().context("Failed to load application configuration")?;
    let app = Application::build(config).context("Application building failed")?;
    log_info!("Application build complete");
    Ok(app)
}

/// 离线命令不需要 RPC，只装配注册表
fn registry_from_config() -> anyhow::Result<ContractRegistry> {
    let config = Config::load().unwrap_or_default();
    let registry = ContractRegistry::with_defaults();
    if let Some(file) = &config.registry.contracts_file {
        registry.load_file(Path::new(file))?;
    }
    Ok(registry)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid request in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
