//! 内置合约种子数据（进程启动时注册，永不过期）
use crate::models::domain::contract::{
    ContractDescriptor, ContractType, EventSignature, FunctionCategory, FunctionParam,
    FunctionSignature, Mutability, Network,
};
use ethers_core::types::Address;
use serde::Deserialize;
use std::collections::BTreeMap;

/// 描述符模板（配置文件里按模板声明合约）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    Erc20,
    Erc721,
}

fn function_map(functions: Vec<FunctionSignature>) -> BTreeMap<String, FunctionSignature> {
    functions.into_iter().map(|f| (f.name.clone(), f)).collect()
}

fn event_map(events: Vec<EventSignature>) -> BTreeMap<String, EventSignature> {
    events.into_iter().map(|e| (e.name.clone(), e)).collect()
}

pub fn erc20_functions() -> Vec<FunctionSignature> {
    use FunctionCategory as C;
    use Mutability as M;
    vec![
        FunctionSignature::new(
            "transfer",
            vec![FunctionParam::address("to"), FunctionParam::amount("amount")],
            M::NonPayable,
            C::Transfer,
        )
        .returns(FunctionParam::new("success", "bool")),
        FunctionSignature::new(
            "transferFrom",
            vec![
                FunctionParam::address("from"),
                FunctionParam::address("to"),
                FunctionParam::amount("amount"),
            ],
            M::NonPayable,
            C::Transfer,
        )
        .returns(FunctionParam::new("success", "bool")),
        FunctionSignature::new(
            "approve",
            vec![FunctionParam::address("spender"), FunctionParam::amount("amount")],
            M::NonPayable,
            C::Approval,
        )
        .returns(FunctionParam::new("success", "bool")),
        FunctionSignature::new("balanceOf", vec![FunctionParam::address("account")], M::View, C::View)
            .returns(FunctionParam::amount("balance")),
        FunctionSignature::new(
            "allowance",
            vec![FunctionParam::address("owner"), FunctionParam::address("spender")],
            M::View,
            C::View,
        )
        .returns(FunctionParam::amount("allowance")),
        FunctionSignature::new("totalSupply", vec![], M::View, C::View)
            .returns(FunctionParam::amount("supply")),
        FunctionSignature::new("decimals", vec![], M::View, C::View)
            .returns(FunctionParam::new("decimals", "uint8")),
        FunctionSignature::new("symbol", vec![], M::View, C::View)
            .returns(FunctionParam::new("symbol", "string")),
        FunctionSignature::new("name", vec![], M::View, C::View)
            .returns(FunctionParam::new("name", "string")),
    ]
}

pub fn erc20_events() -> Vec<EventSignature> {
    vec![
        EventSignature::new(
            "Transfer",
            &[("from", "address", true), ("to", "address", true), ("value", "uint256", false)],
        ),
        EventSignature::new(
            "Approval",
            &[("owner", "address", true), ("spender", "address", true), ("value", "uint256", false)],
        ),
    ]
}

/// 可增发/销毁/暂停/黑名单的稳定币管理函数
fn stablecoin_admin_functions() -> Vec<FunctionSignature> {
    use FunctionCategory as C;
    use Mutability as M;
    vec![
        FunctionSignature::new(
            "mint",
            vec![FunctionParam::address("to"), FunctionParam::amount("amount")],
            M::NonPayable,
            C::Mint,
        )
        .returns(FunctionParam::new("success", "bool")),
        FunctionSignature::new("burn", vec![FunctionParam::amount("amount")], M::NonPayable, C::Burn),
        FunctionSignature::new("pause", vec![], M::NonPayable, C::Admin),
        FunctionSignature::new("unpause", vec![], M::NonPayable, C::Admin),
        FunctionSignature::new("blacklist", vec![FunctionParam::address("account")], M::NonPayable, C::Admin),
        FunctionSignature::new("isBlacklisted", vec![FunctionParam::address("account")], M::View, C::View)
            .returns(FunctionParam::new("blacklisted", "bool")),
        FunctionSignature::new(
            "transferOwnership",
            vec![FunctionParam::address("newOwner")],
            M::NonPayable,
            C::Admin,
        ),
    ]
}

fn weth_functions() -> Vec<FunctionSignature> {
    vec![
        FunctionSignature::new("deposit", vec![], Mutability::Payable, FunctionCategory::Mint),
        FunctionSignature::new(
            "withdraw",
            vec![FunctionParam::amount("wad")],
            Mutability::NonPayable,
            FunctionCategory::Burn,
        ),
    ]
}

fn weth_events() -> Vec<EventSignature> {
    vec![
        EventSignature::new("Deposit", &[("dst", "address", true), ("wad", "uint256", false)]),
        EventSignature::new("Withdrawal", &[("src", "address", true), ("wad", "uint256", false)]),
    ]
}

pub fn erc721_functions() -> Vec<FunctionSignature> {
    use FunctionCategory as C;
    use Mutability as M;
    vec![
        FunctionSignature::new(
            "transferFrom",
            vec![
                FunctionParam::address("from"),
                FunctionParam::address("to"),
                FunctionParam::uint("tokenId"),
            ],
            M::NonPayable,
            C::Transfer,
        ),
        FunctionSignature::new(
            "safeTransferFrom",
            vec![
                FunctionParam::address("from"),
                FunctionParam::address("to"),
                FunctionParam::uint("tokenId"),
            ],
            M::NonPayable,
            C::Transfer,
        ),
        FunctionSignature::new(
            "approve",
            vec![FunctionParam::address("to"), FunctionParam::uint("tokenId")],
            M::NonPayable,
            C::Approval,
        ),
        FunctionSignature::new(
            "setApprovalForAll",
            vec![FunctionParam::address("operator"), FunctionParam::new("approved", "bool")],
            M::NonPayable,
            C::Approval,
        ),
        FunctionSignature::new("ownerOf", vec![FunctionParam::uint("tokenId")], M::View, C::View)
            .returns(FunctionParam::address("owner")),
        FunctionSignature::new("balanceOf", vec![FunctionParam::address("owner")], M::View, C::View)
            .returns(FunctionParam::uint("balance")),
    ]
}

pub fn erc721_events() -> Vec<EventSignature> {
    vec![
        EventSignature::new(
            "Transfer",
            &[("from", "address", true), ("to", "address", true), ("tokenId", "uint256", true)],
        ),
        EventSignature::new(
            "Approval",
            &[("owner", "address", true), ("approved", "address", true), ("tokenId", "uint256", true)],
        ),
        EventSignature::new(
            "ApprovalForAll",
            &[("owner", "address", true), ("operator", "address", true), ("approved", "bool", false)],
        ),
    ]
}

/// 按模板构造描述符
pub fn from_template(
    template: Template,
    network: Network,
    address: Address,
    symbol: &str,
    decimals: u8,
    contract_type: ContractType,
) -> ContractDescriptor {
    let (functions, events) = match template {
        Template::Erc20 => (erc20_functions(), erc20_events()),
        Template::Erc721 => (erc721_functions(), erc721_events()),
    };
    ContractDescriptor {
        address,
        network,
        symbol: symbol.to_string(),
        decimals,
        contract_type,
        functions: function_map(functions),
        events: event_map(events),
    }
}

fn erc20(network: Network, address: &str, symbol: &str, decimals: u8) -> ContractDescriptor {
    from_template(
        Template::Erc20,
        network,
        parse_seed_address(address),
        symbol,
        decimals,
        ContractType::Fungible,
    )
}

/// 种子数据是静态表，解析失败属于编程错误
fn parse_seed_address(address: &str) -> Address {
    address
        .parse()
        .unwrap_or_else(|e| panic!("invalid seed address {}: {}", address, e))
}

pub fn default_descriptors() -> Vec<ContractDescriptor> {
    let mut usdc = erc20(
        Network::Mainnet,
        "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
        "USDC",
        6,
    );
    usdc.functions.extend(function_map(stablecoin_admin_functions()));

    let usdt = erc20(
        Network::Mainnet,
        "0xdac17f958d2ee523a2206206994597c13d831ec7",
        "USDT",
        6,
    );
    let dai = erc20(
        Network::Mainnet,
        "0x6b175474e89094c44da98b954eedeac495271d0f",
        "DAI",
        18,
    );

    let mut weth = erc20(
        Network::Mainnet,
        "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2",
        "WETH",
        18,
    );
    weth.functions.extend(function_map(weth_functions()));
    weth.events.extend(event_map(weth_events()));

    let mut sepolia_usdc = erc20(
        Network::Sepolia,
        "0x1c7d4b196cb0c7b01d743fbc6116a902379c7238",
        "USDC",
        6,
    );
    sepolia_usdc.functions.extend(function_map(stablecoin_admin_functions()));

    let bayc = from_template(
        Template::Erc721,
        Network::Mainnet,
        parse_seed_address("0xbc4ca0eda7647a8ab7c2061c2e118a18a936f13d"),
        "BAYC",
        0,
        ContractType::NonFungible,
    );

    vec![usdc, usdt, dai, weth, sepolia_usdc, bayc]
}
