pub mod contract_registry;
pub mod seed;

pub use contract_registry::ContractRegistry;
