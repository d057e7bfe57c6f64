use std::time::Duration;
use thiserror::Error;

/// Thermo 统一错误类型
#[derive(Error, Debug)]
pub enum ThermoError {
    /// 致命，启动阶段即终止
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 可恢复，跳过本轮采样
    #[error("Sensor error: {0}")]
    Sensor(String),

    /// 可恢复，入队并退避
    #[error("Delivery failure: {0}")]
    Delivery(#[from] DeliveryFailure),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Stale or future timestamp: skew {skew_secs}s exceeds window {window_secs}s")]
    StaleOrFutureTimestamp { skew_secs: i64, window_secs: u64 },

    #[error("Signature mismatch")]
    SignatureMismatch,

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, ThermoError>;

impl ThermoError {
    pub fn config(msg: impl Into<String>) -> Self {
        ThermoError::Configuration(msg.into())
    }

    pub fn sensor(msg: impl Into<String>) -> Self {
        ThermoError::Sensor(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        ThermoError::MalformedPayload(msg.into())
    }

    /// Authentication failures of a single request (401-equivalent).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ThermoError::InvalidTimestamp(_)
                | ThermoError::StaleOrFutureTimestamp { .. }
                | ThermoError::SignatureMismatch
        )
    }

    /// 用于指标标签
    pub fn reason(&self) -> &'static str {
        match self {
            ThermoError::Configuration(_) => "configuration",
            ThermoError::Sensor(_) => "sensor",
            ThermoError::Delivery(_) => "delivery",
            ThermoError::InvalidTimestamp(_) => "invalid_timestamp",
            ThermoError::StaleOrFutureTimestamp { .. } => "stale_or_future_timestamp",
            ThermoError::SignatureMismatch => "signature_mismatch",
            ThermoError::MalformedPayload(_) => "malformed_payload",
            ThermoError::Io(_) => "io",
            ThermoError::Serialization(_) => "serialization",
        }
    }
}

/// 投递失败原因，保留给日志使用
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryFailure {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid acknowledgement: {0}")]
    InvalidAck(String),
}
