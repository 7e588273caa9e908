pub mod analysis;
pub mod contract;
pub mod request;
pub mod result;

pub use analysis::{
    CategoryAnalysis, DecodedError, EfficiencyTier, GasComparison, GasCost, GasEfficiency, GasExtreme,
    Severity,
};
pub use contract::{
    ContractDescriptor, ContractType, EventSignature, FunctionCategory, FunctionParam,
    FunctionSignature, Mutability, Network,
};
pub use request::{
    BatchOperation, BatchRequest, BlockRef, BlockTag, ComparisonRequest, ParamValue,
    SimulationRequest,
};
pub use result::{BatchResult, ComparisonResult, InternalCall, SimulationResult, StateChange};
