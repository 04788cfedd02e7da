//! 编排器错误类型
//!
//! 能力调用失败、Oracle 失败、认证失败分开建模：
//! 能力层错误由 Orchestrator 捕获并记为失败 Step，Oracle 错误在适配层被吸收为降级回答，
//! 认证错误只在 Oracle 初始化时返回给宿主。

use thiserror::Error;

/// 编排运行过程中可能出现的错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForagerError {
    /// Action 引用了未注册的能力
    #[error("Capability '{0}' not found (not available in this host)")]
    CapabilityNotFound(String),

    #[error("Capability '{name}' failed: {reason}")]
    CapabilityFailed { name: String, reason: String },

    #[error("Capability '{0}' timed out")]
    CapabilityTimeout(String),

    /// 能力实现内部 panic（相当于未捕获异常）
    #[error("Capability '{name}' panicked: {message}")]
    CapabilityPanicked { name: String, message: String },

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Config error: {0}")]
    Config(String),
}

/// 推理 Oracle 调用失败（网络、超时、后端返回错误）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),

    #[error("Oracle timed out after {0}s")]
    Timeout(u64),

    #[error("Oracle backend error: {0}")]
    Backend(String),
}

/// Oracle 初始化时的认证/配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthenticationError {
    #[error("Missing API key for backend '{0}'")]
    MissingApiKey(String),

    #[error("Invalid API key for backend '{0}'")]
    InvalidApiKey(String),

    #[error("Unknown oracle backend: {0}")]
    UnknownBackend(String),
}

impl ForagerError {
    /// 是否为 panic 类错误：此类错误会中止当前 attempt 的剩余 Action
    pub fn is_panic(&self) -> bool {
        matches!(self, ForagerError::CapabilityPanicked { .. })
    }
}
