use ethers_core::types::H256;
use ethers_core::utils::keccak256;
use lazy_static::lazy_static;

/// Error(string) 选择器
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];
/// Panic(uint256) 选择器
pub const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

lazy_static! {
    /// Transfer(address,address,uint256)
    pub static ref ERC20_TRANSFER_TOPIC: H256 =
        H256::from(keccak256("Transfer(address,address,uint256)"));
    /// Approval(address,address,uint256)
    pub static ref ERC20_APPROVAL_TOPIC: H256 =
        H256::from(keccak256("Approval(address,address,uint256)"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers_core::utils::id;

    #[test]
    fn selectors_are_consistent() {
        assert_eq!(id("Error(string)"), ERROR_STRING_SELECTOR);
        assert_eq!(id("Panic(uint256)"), PANIC_SELECTOR);
        assert_eq!(
            format!("{:#x}", *ERC20_APPROVAL_TOPIC),
            "0x8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925"
        );
    }
}
