//! 推理后端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / 离线启发式 / Mock）实现 OracleBackend：complete（非流式）。
//! 后端在启动时按配置选定一次，OracleAdapter 只依赖这个 trait。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::OracleError;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    System,
    User,
}

/// 单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// 推理后端 trait
#[async_trait]
pub trait OracleBackend: Send + Sync {
    /// 后端名（日志用）
    fn name(&self) -> &str;

    /// 非流式完成，返回自由文本
    async fn complete(&self, messages: &[Message]) -> Result<String, OracleError>;

    /// 是否为离线启发式（无真实推理服务）
    fn is_offline(&self) -> bool {
        false
    }
}

/// 取最后一条 User 消息的内容
pub fn last_user_content(messages: &[Message]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or("")
}
