pub mod config;

pub use self::config::{CacheConfig, Config, NetworkConfig, RegistryConfig, SimulationConfig};
