use crate::models::domain::contract::FunctionCategory;
use crate::models::domain::result::SimulationResult;
use crate::utils::format::{format_gas, format_units_trimmed};
use ethers_core::types::U256;
use lazy_static::lazy_static;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub use crate::models::domain::analysis::{
    CategoryAnalysis, EfficiencyTier, GasComparison, GasCost, GasEfficiency, GasExtreme,
};

/// 未登记函数的基准 gas
pub const DEFAULT_BASELINE_GAS: u64 = 50_000;

lazy_static! {
    /// 函数名 -> 预期 gas 基准
    static ref FUNCTION_BASELINES: HashMap<&'static str, u64> = HashMap::from([
        ("transfer", 51_000),
        ("transferFrom", 60_000),
        ("approve", 46_000),
        ("mint", 70_000),
        ("burn", 40_000),
        ("deposit", 45_000),
        ("withdraw", 35_000),
        ("balanceOf", 25_000),
        ("allowance", 25_000),
        ("totalSupply", 23_500),
        ("pause", 30_000),
        ("unpause", 30_000),
        ("setApprovalForAll", 46_000),
        ("safeTransferFrom", 85_000),
    ]);
}

/// 分类平均 gas 的档位阈值 (high 上限, medium 上限)
fn category_thresholds(category: FunctionCategory) -> (u64, u64) {
    match category {
        FunctionCategory::Transfer => (55_000, 80_000),
        FunctionCategory::Approval => (50_000, 70_000),
        FunctionCategory::Mint => (75_000, 110_000),
        FunctionCategory::Burn => (45_000, 70_000),
        FunctionCategory::Admin => (35_000, 60_000),
        FunctionCategory::View => (30_000, 50_000),
        FunctionCategory::Other => (60_000, 100_000),
    }
}

fn category_suggestion(category: FunctionCategory, tier: EfficiencyTier) -> Option<&'static str> {
    use EfficiencyTier::{High, Low, Medium};
    use FunctionCategory as C;
    match (category, tier) {
        (_, High) => None,
        (C::Transfer, Medium) => Some("Transfers to fresh recipients pay for a new storage slot; reuse warm accounts where possible"),
        (C::Transfer, Low) => Some("Batch transfers or check for transfer hooks and fee-on-transfer logic in the token"),
        (C::Approval, Medium) => Some("Avoid resetting an allowance to zero before setting a new value"),
        (C::Approval, Low) => Some("Consider permit signatures instead of separate approval transactions"),
        (C::Mint, Medium) => Some("Group mints into fewer transactions"),
        (C::Mint, Low) => Some("Minting touches several storage slots; check for extra supply bookkeeping"),
        (C::Burn, Medium) => Some("Burn larger amounts less frequently"),
        (C::Burn, Low) => Some("Check for hooks or extra accounting executed on burn"),
        (C::Admin, Medium) => Some("Schedule administrative calls outside peak gas periods"),
        (C::Admin, Low) => Some("Administrative calls are unusually expensive; review access control checks"),
        (C::View, Medium) => Some("Read calls cost nothing off-chain; call them with eth_call instead of transactions"),
        (C::View, Low) => Some("Cache view results instead of reading them inside transactions"),
        (C::Other, Medium) => Some("Review the call for redundant storage writes"),
        (C::Other, Low) => Some("Profile the call with a trace to find expensive internal calls"),
    }
}

/// 函数的预期基准 gas
pub fn baseline_for(function_name: &str) -> u64 {
    FUNCTION_BASELINES
        .get(function_name)
        .copied()
        .unwrap_or(DEFAULT_BASELINE_GAS)
}

/// 按实际 gas 与基准的比值分档
pub fn categorize(function_name: &str, gas_used: u64) -> GasEfficiency {
    let ratio = gas_used as f64 / baseline_for(function_name) as f64;
    if ratio <= 0.8 {
        GasEfficiency::HighlyEfficient
    } else if ratio <= 1.0 {
        GasEfficiency::Efficient
    } else if ratio <= 1.3 {
        GasEfficiency::Moderate
    } else if ratio <= 1.6 {
        GasEfficiency::HighGas
    } else {
        GasEfficiency::VeryHighGas
    }
}

/// 按语义分类汇总 gas（只统计可用结果），按分类顺序输出
pub fn analyze_distribution(results: &[SimulationResult]) -> Vec<CategoryAnalysis> {
    let usable: Vec<&SimulationResult> = results.iter().filter(|r| r.is_usable()).collect();
    let total: u64 = usable.iter().map(|r| r.gas_used).sum();

    let mut groups: BTreeMap<FunctionCategory, (usize, u64)> = BTreeMap::new();
    for r in &usable {
        let entry = groups.entry(r.operation_category).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += r.gas_used;
    }

    groups
        .into_iter()
        .map(|(category, (count, total_gas))| {
            let average_gas = total_gas / count as u64;
            let (high, medium) = category_thresholds(category);
            let tier = if average_gas <= high {
                EfficiencyTier::High
            } else if average_gas <= medium {
                EfficiencyTier::Medium
            } else {
                EfficiencyTier::Low
            };
            let share_percent = if total == 0 {
                0.0
            } else {
                total_gas as f64 / total as f64 * 100.0
            };
            CategoryAnalysis {
                category,
                count,
                total_gas,
                average_gas,
                share_percent,
                tier,
                suggestion: category_suggestion(category, tier).map(str::to_string),
            }
        })
        .collect()
}

/// 比较多组结果的 gas，极值与均值只看可用结果
pub fn compare(results: &[SimulationResult]) -> GasComparison {
    let usable: Vec<(usize, &SimulationResult)> = results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_usable())
        .collect();

    let extreme = |(index, r): &(usize, &SimulationResult)| GasExtreme {
        index: *index,
        function_name: r.function_name().to_string(),
        gas_used: r.gas_used,
    };
    // 相同 gas 时取靠前的
    let most = usable
        .iter()
        .min_by(|a, b| a.1.gas_used.cmp(&b.1.gas_used).then(a.0.cmp(&b.0)))
        .map(extreme);
    let least = usable
        .iter()
        .max_by(|a, b| a.1.gas_used.cmp(&b.1.gas_used).then(b.0.cmp(&a.0)))
        .map(extreme);

    let average_gas = if usable.is_empty() {
        0
    } else {
        usable.iter().map(|(_, r)| r.gas_used).sum::<u64>() / usable.len() as u64
    };
    let range = match (&most, &least) {
        (Some(min), Some(max)) => max.gas_used - min.gas_used,
        _ => 0,
    };

    let mut recommendations = Vec::new();
    if let Some(min) = most.as_ref().filter(|m| m.gas_used > 0) {
        let variation = range as f64 / min.gas_used as f64;
        if variation > 0.5 {
            recommendations.push(format!(
                "Significant gas variation ({:.0}%) between variants: prefer the variant at index {} ({} gas)",
                variation * 100.0,
                min.index,
                format_gas(min.gas_used)
            ));
        } else if variation > 0.2 {
            recommendations.push(format!(
                "Moderate gas variation ({:.0}%) between variants",
                variation * 100.0
            ));
        }
    }

    let functions: BTreeSet<&str> = usable.iter().map(|(_, r)| r.function_name()).collect();
    if functions.len() > 1 {
        recommendations.push(format!(
            "Comparing different functions ({}); gas figures are not directly comparable",
            functions.into_iter().collect::<Vec<_>>().join(", ")
        ));
    }

    let failed = results.iter().filter(|r| !r.is_usable()).count();
    if failed > 0 {
        recommendations.push(format!(
            "{} variant(s) failed outright; review their errors before comparing",
            failed
        ));
    }

    GasComparison {
        most_efficient: most,
        least_efficient: least,
        average_gas,
        range,
        recommendations,
    }
}

/// gas 成本换算，纯计算
pub fn cost_of(gas_used: u64, gas_price_wei: U256, reference_price_usd: f64) -> GasCost {
    let wei = U256::from(gas_used).saturating_mul(gas_price_wei);
    let cost_native = format_units_trimmed(wei, 18);
    let cost_usd = cost_native.parse::<f64>().unwrap_or(0.0) * reference_price_usd;
    GasCost {
        gas_used,
        gas_price_gwei: format_units_trimmed(gas_price_wei, 9),
        cost_native,
        cost_usd,
    }
}
