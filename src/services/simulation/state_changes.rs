//! 从 trace 日志还原 Transfer / Approval / Mint / Burn
use crate::infrastructure::provider::TraceLog;
use crate::models::domain::contract::ContractDescriptor;
use crate::models::domain::result::StateChange;
use crate::utils::format::format_units_trimmed;
use ethers_contract::EthEvent;
use ethers_core::abi::RawLog;
use ethers_core::types::{Address, H256, U256};

#[derive(EthEvent, Debug)]
#[ethevent(name = "Transfer", abi = "Transfer(address,address,uint256)")]
pub struct TransferEvent {
    #[ethevent(indexed)]
    pub from: Address,
    #[ethevent(indexed)]
    pub to: Address,
    pub value: U256,
}

#[derive(EthEvent, Debug)]
#[ethevent(name = "Approval", abi = "Approval(address,address,uint256)")]
pub struct ApprovalEvent {
    #[ethevent(indexed)]
    pub owner: Address,
    #[ethevent(indexed)]
    pub spender: Address,
    pub value: U256,
}

#[derive(EthEvent, Debug)]
#[ethevent(name = "Deposit", abi = "Deposit(address,uint256)")]
pub struct DepositEvent {
    #[ethevent(indexed)]
    pub dst: Address,
    pub wad: U256,
}

#[derive(EthEvent, Debug)]
#[ethevent(name = "Withdrawal", abi = "Withdrawal(address,uint256)")]
pub struct WithdrawalEvent {
    #[ethevent(indexed)]
    pub src: Address,
    pub wad: U256,
}

/// 只解码目标合约发出、且主题在其事件表中的日志
pub fn extract_state_changes(logs: &[TraceLog], contract: &ContractDescriptor) -> Vec<StateChange> {
    logs.iter()
        .filter(|log| log.address == contract.address)
        .filter(|log| {
            log.topics
                .first()
                .is_some_and(|topic| contract.has_event_topic(topic))
        })
        .filter_map(|log| decode_log(log, contract))
        .collect()
}

fn decode_log(log: &TraceLog, contract: &ContractDescriptor) -> Option<StateChange> {
    let raw = RawLog {
        topics: log.topics.clone(),
        data: log.data.to_vec(),
    };
    let token = contract.address;
    let amount = |value: U256| format_units_trimmed(value, contract.decimals);
    let topic0 = *log.topics.first()?;

    if topic0 == TransferEvent::signature() {
        // ERC721 的 tokenId 也是 indexed，需要单独处理
        let (from, to, value) = match TransferEvent::decode_log(&raw) {
            Ok(e) => (e.from, e.to, e.value),
            Err(_) if log.topics.len() == 4 => (
                topic_address(&log.topics[1]),
                topic_address(&log.topics[2]),
                U256::from_big_endian(log.topics[3].as_bytes()),
            ),
            Err(_) => return None,
        };
        let amount = amount(value);
        return Some(if from.is_zero() {
            StateChange::Mint { token, to, amount }
        } else if to.is_zero() {
            StateChange::Burn { token, from, amount }
        } else {
            StateChange::Transfer {
                token,
                from,
                to,
                amount,
            }
        });
    }

    if topic0 == ApprovalEvent::signature() {
        let (owner, spender, value) = match ApprovalEvent::decode_log(&raw) {
            Ok(e) => (e.owner, e.spender, e.value),
            Err(_) if log.topics.len() == 4 => (
                topic_address(&log.topics[1]),
                topic_address(&log.topics[2]),
                U256::from_big_endian(log.topics[3].as_bytes()),
            ),
            Err(_) => return None,
        };
        return Some(StateChange::Approval {
            token,
            owner,
            spender,
            amount: amount(value),
        });
    }

    if topic0 == DepositEvent::signature() {
        let e = DepositEvent::decode_log(&raw).ok()?;
        return Some(StateChange::Mint {
            token,
            to: e.dst,
            amount: amount(e.wad),
        });
    }

    if topic0 == WithdrawalEvent::signature() {
        let e = WithdrawalEvent::decode_log(&raw).ok()?;
        return Some(StateChange::Burn {
            token,
            from: e.src,
            amount: amount(e.wad),
        });
    }

    None
}

fn topic_address(topic: &H256) -> Address {
    Address::from_slice(&topic.as_bytes()[12..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::protocol::{ERC20_APPROVAL_TOPIC, ERC20_TRANSFER_TOPIC};
    use crate::infrastructure::registry::ContractRegistry;
    use crate::models::domain::contract::Network;
    use ethers_core::abi::{Token, encode};

    const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

    fn address_topic(a: Address) -> H256 {
        H256::from(a)
    }

    fn amount_data(v: u64) -> ethers_core::types::Bytes {
        encode(&[Token::Uint(U256::from(v))]).into()
    }

    fn usdc() -> std::sync::Arc<ContractDescriptor> {
        ContractRegistry::with_defaults()
            .lookup(USDC, Network::Mainnet)
            .unwrap()
    }

    #[test]
    fn decodes_transfer_mint_and_approval() {
        let contract = usdc();
        let alice = Address::repeat_byte(0x11);
        let bob = Address::repeat_byte(0x22);
        let logs = vec![
            TraceLog {
                address: contract.address,
                topics: vec![*ERC20_TRANSFER_TOPIC, address_topic(alice), address_topic(bob)],
                data: amount_data(1_500_000),
            },
            TraceLog {
                address: contract.address,
                topics: vec![*ERC20_TRANSFER_TOPIC, H256::zero(), address_topic(bob)],
                data: amount_data(2_000_000),
            },
            TraceLog {
                address: contract.address,
                topics: vec![*ERC20_APPROVAL_TOPIC, address_topic(alice), address_topic(bob)],
                data: amount_data(0),
            },
        ];
        let changes = extract_state_changes(&logs, &contract);
        assert_eq!(
            changes,
            vec![
                StateChange::Transfer {
                    token: contract.address,
                    from: alice,
                    to: bob,
                    amount: "1.5".into()
                },
                StateChange::Mint {
                    token: contract.address,
                    to: bob,
                    amount: "2".into()
                },
                StateChange::Approval {
                    token: contract.address,
                    owner: alice,
                    spender: bob,
                    amount: "0".into()
                },
            ]
        );
    }

    #[test]
    fn ignores_foreign_contracts_and_unknown_topics() {
        let contract = usdc();
        let logs = vec![
            TraceLog {
                address: Address::repeat_byte(0x99),
                topics: vec![*ERC20_TRANSFER_TOPIC, H256::zero(), H256::zero()],
                data: amount_data(1),
            },
            TraceLog {
                address: contract.address,
                topics: vec![H256::repeat_byte(0xab)],
                data: amount_data(1),
            },
        ];
        assert!(extract_state_changes(&logs, &contract).is_empty());
        assert!(extract_state_changes(&[], &contract).is_empty());
    }

    #[test]
    fn decodes_erc721_transfer_with_indexed_token_id() {
        let bayc = ContractRegistry::with_defaults()
            .lookup("0xbc4ca0eda7647a8ab7c2061c2e118a18a936f13d", Network::Mainnet)
            .unwrap();
        let alice = Address::repeat_byte(0x11);
        let bob = Address::repeat_byte(0x22);
        let mut id = [0u8; 32];
        id[31] = 42;
        let logs = vec![TraceLog {
            address: bayc.address,
            topics: vec![
                *ERC20_TRANSFER_TOPIC,
                address_topic(alice),
                address_topic(bob),
                H256::from(id),
            ],
            data: Default::default(),
        }];
        let changes = extract_state_changes(&logs, &bayc);
        assert_eq!(
            changes,
            vec![StateChange::Transfer {
                token: bayc.address,
                from: alice,
                to: bob,
                amount: "42".into()
            }]
        );
    }
}
