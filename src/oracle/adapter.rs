//! Oracle 适配层
//!
//! 统一 reason(prompt, context) -> OracleVerdict 接口。后端在 initialize 时按配置选定一次；
//! 后端出错或超时不会向调用方传播，而是返回降级回答（degraded = true，空文本，置信度 0）。

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::OracleSection;
use crate::core::{AuthenticationError, OracleError};
use crate::oracle::confidence::extract_confidence;
use crate::oracle::{
    create_deepseek_backend, Message, OfflineHeuristic, OpenAiBackend, OracleBackend,
    OPENAI_DEFAULT_MODEL,
};

const BASE_INSTRUCTIONS: &str = "You are the reasoning oracle of an automated web reconnaissance orchestrator. \
Answer in concise plain prose. When asked for a judgement, start with a clear Yes or No and \
state your confidence as `confidence: <0..1>`.";

/// API key 最短长度
const MIN_KEY_LEN: usize = 8;

/// Oracle 的一次回答
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OracleVerdict {
    /// 回答的第一条非空行
    pub verdict: String,
    /// 完整回答（已 trim）
    pub content: String,
    /// [0,1]
    pub confidence: f64,
    /// 后端调用失败或超时
    pub degraded: bool,
}

impl OracleVerdict {
    pub fn from_text(text: &str) -> Self {
        let content = text.trim().to_string();
        let verdict = content
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or_default()
            .to_string();
        Self {
            confidence: extract_confidence(&content),
            verdict,
            content,
            degraded: false,
        }
    }

    pub fn degraded() -> Self {
        Self {
            verdict: String::new(),
            content: String::new(),
            confidence: 0.0,
            degraded: true,
        }
    }
}

/// 后端选择与凭据
#[derive(Debug, Clone, Default)]
pub struct OracleCredentials {
    /// openai / deepseek / offline（auto 已在 from_config 中解析）
    pub backend: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl OracleCredentials {
    pub fn offline() -> Self {
        Self {
            backend: "offline".to_string(),
            ..Default::default()
        }
    }

    /// 由 [oracle] 段解析；api_key 未配置时读取 OPENAI_API_KEY / DEEPSEEK_API_KEY。
    /// backend = auto 时按可用 key 选择，都没有则为 offline
    pub fn from_config(section: &OracleSection) -> Self {
        let backend = section.backend.trim().to_lowercase();
        let configured = section.api_key.clone().filter(|k| !k.trim().is_empty());
        let (backend, api_key) = match backend.as_str() {
            "auto" | "" => {
                if let Some(key) = configured.clone().or_else(|| env_key("OPENAI_API_KEY")) {
                    ("openai".to_string(), Some(key))
                } else if let Some(key) = env_key("DEEPSEEK_API_KEY") {
                    ("deepseek".to_string(), Some(key))
                } else {
                    ("offline".to_string(), None)
                }
            }
            "openai" => ("openai".to_string(), configured.or_else(|| env_key("OPENAI_API_KEY"))),
            "deepseek" => (
                "deepseek".to_string(),
                configured.or_else(|| env_key("DEEPSEEK_API_KEY")),
            ),
            other => (other.to_string(), configured),
        };
        Self {
            backend,
            api_key,
            base_url: section.base_url.clone(),
        }
    }
}

fn validate_key(backend: &str, key: Option<&str>) -> Result<String, AuthenticationError> {
    let key = key.ok_or_else(|| AuthenticationError::MissingApiKey(backend.to_string()))?;
    if key.trim().is_empty() || key.chars().any(char::is_whitespace) || key.len() < MIN_KEY_LEN {
        return Err(AuthenticationError::InvalidApiKey(backend.to_string()));
    }
    Ok(key.to_string())
}

/// Oracle 适配器：持有选定的后端与单次调用超时
#[derive(Clone)]
pub struct OracleAdapter {
    backend: Arc<dyn OracleBackend>,
    timeout: Duration,
}

impl OracleAdapter {
    /// 离线启发式适配器（无需凭据）
    pub fn offline() -> Self {
        Self::with_backend(Arc::new(OfflineHeuristic::new()), Duration::from_secs(60))
    }

    pub fn with_backend(backend: Arc<dyn OracleBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// 按 [oracle] 段创建并初始化
    pub fn from_config(section: &OracleSection) -> Result<Self, AuthenticationError> {
        let mut adapter = Self::offline();
        adapter.timeout = Duration::from_secs(section.timeout_secs.max(1));
        adapter.initialize(&OracleCredentials::from_config(section), section.model.as_deref())?;
        Ok(adapter)
    }

    /// 选定并构建后端；失败时保持原后端不变
    pub fn initialize(
        &mut self,
        credentials: &OracleCredentials,
        model_hint: Option<&str>,
    ) -> Result<(), AuthenticationError> {
        let backend: Arc<dyn OracleBackend> = match credentials.backend.as_str() {
            "offline" => Arc::new(OfflineHeuristic::new()),
            "openai" => {
                let key = validate_key("openai", credentials.api_key.as_deref())?;
                Arc::new(OpenAiBackend::new(
                    credentials.base_url.as_deref(),
                    model_hint.unwrap_or(OPENAI_DEFAULT_MODEL),
                    &key,
                ))
            }
            "deepseek" => {
                let key = validate_key("deepseek", credentials.api_key.as_deref())?;
                Arc::new(create_deepseek_backend(
                    &key,
                    model_hint,
                    credentials.base_url.as_deref(),
                ))
            }
            other => return Err(AuthenticationError::UnknownBackend(other.to_string())),
        };
        tracing::info!(backend = %backend.name(), "oracle initialized");
        self.backend = backend;
        Ok(())
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn is_offline(&self) -> bool {
        self.backend.is_offline()
    }

    /// 向后端提问；任何失败都转为降级回答
    pub async fn reason(&self, prompt: &str, context: Option<&str>) -> OracleVerdict {
        let system = match context {
            Some(ctx) if !ctx.trim().is_empty() => format!("{BASE_INSTRUCTIONS}\n\nRun context:\n{ctx}"),
            _ => BASE_INSTRUCTIONS.to_string(),
        };
        let messages = [Message::system(system), Message::user(prompt)];
        tracing::debug!(backend = %self.backend.name(), prompt_len = prompt.len(), "oracle request");

        let outcome = match tokio::time::timeout(self.timeout, self.backend.complete(&messages)).await {
            Ok(res) => res,
            Err(_) => Err(OracleError::Timeout(self.timeout.as_secs())),
        };

        match outcome {
            Ok(text) => {
                let verdict = OracleVerdict::from_text(&text);
                tracing::debug!(
                    verdict = %verdict.verdict,
                    confidence = verdict.confidence,
                    "oracle answer"
                );
                verdict
            }
            Err(e) => {
                tracing::warn!(backend = %self.backend.name(), error = %e, "oracle call failed, degraded verdict");
                OracleVerdict::degraded()
            }
        }
    }
}

impl std::fmt::Debug for OracleAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleAdapter")
            .field("backend", &self.backend.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}
