pub mod cache;
pub mod error_decoder;
pub mod gas_analyzer;
pub mod simulation_service;
pub mod state_changes;
pub mod validator;

pub use cache::ResultCache;
pub use error_decoder::{DecodedError, Severity};
pub use gas_analyzer::{CategoryAnalysis, GasComparison, GasCost, GasEfficiency};
pub use simulation_service::SimulationService;
pub use validator::{ValidationOutcome, Validator};
