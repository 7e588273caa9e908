use ethers_core::types::Bytes;
use ethers_providers::ProviderError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// 参数预检失败（阻断，不会发起任何网络请求）
    #[error("Invalid parameters: {}", .0.join("; "))]
    InvalidParameters(Vec<String>),

    // ===== 编码错误 =====
    #[error("Argument count mismatch: expected {expected}, got {got}")]
    ArgumentCountMismatch { expected: usize, got: usize },

    #[error("Unsupported parameter type: {0}")]
    UnsupportedType(String),

    #[error("无效的地址: {0}")]
    InvalidAddress(String),

    #[error("无效的数字: {0}")]
    InvalidNumeric(String),

    #[error("Parameter {param} expects {expected}, got {got}")]
    TypeMismatch {
        param: String,
        expected: String,
        got: String,
    },

    // ===== 查找错误 =====
    #[error("Unknown contract {address} on {network}")]
    UnknownContract { address: String, network: String },

    #[error("Function {function} is not declared on contract {contract}")]
    UnknownFunction { contract: String, function: String },

    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),

    // ===== 节点调用错误 =====
    /// 模拟调用被回滚（携带节点返回的原始 revert data）
    #[error("Call reverted: {message}")]
    CallReverted {
        message: String,
        data: Option<Bytes>,
    },

    #[error("Gas estimation failed: {0}")]
    GasEstimation(String),

    #[error("Trace unavailable: {0}")]
    Trace(String),

    #[error("无效的provider: {0}")]
    ProviderError(String),

    #[error("RPC request timed out after {0}s")]
    Timeout(u64),

    #[error("无效的URL: {0}")]
    InvalidUrl(String),

    // ===== 基础设施 =====
    #[error("配置错误: {0}")]
    Config(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("IO错误: {0}")]
    Io(String),

    /// 内部不可预期错误（兜底）
    #[error("内部错误: {0}")]
    Internal(String),
}

impl AppError {
    pub fn new(message: &str) -> Self {
        AppError::Internal(message.to_string())
    }

    /// 编码阶段错误：参数无法转换为 ABI 线上格式
    pub fn is_encoding(&self) -> bool {
        matches!(
            self,
            AppError::ArgumentCountMismatch { .. }
                | AppError::UnsupportedType(_)
                | AppError::InvalidAddress(_)
                | AppError::InvalidNumeric(_)
                | AppError::TypeMismatch { .. }
        )
    }

    /// 在结果对象产生之前直接返回给调用方的错误
    /// 其余错误都会被吸收为 success=false 的 SimulationResult
    pub fn is_blocking(&self) -> bool {
        self.is_encoding()
            || matches!(
                self,
                AppError::InvalidParameters(_)
                    | AppError::UnknownContract { .. }
                    | AppError::UnknownFunction { .. }
                    | AppError::UnsupportedNetwork(_)
            )
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        AppError::ProviderError(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<notify::Error> for AppError {
    fn from(err: notify::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocking_classification() {
        assert!(AppError::InvalidParameters(vec!["x".into()]).is_blocking());
        assert!(AppError::InvalidAddress("0x1".into()).is_blocking());
        assert!(AppError::UnsupportedType("string".into()).is_encoding());
        assert!(!AppError::GasEstimation("boom".into()).is_blocking());
        assert!(
            !AppError::CallReverted {
                message: "execution reverted".into(),
                data: None
            }
            .is_blocking()
        );
    }

    #[test]
    fn invalid_parameters_message_joins_reasons() {
        let err = AppError::InvalidParameters(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Invalid parameters: a; b");
    }
}
