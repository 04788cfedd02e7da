//! 脚本化 Mock 后端（测试用）
//!
//! 以闭包按 prompt 作答，并记录收到的每条 user prompt。

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::core::OracleError;
use crate::oracle::traits::last_user_content;
use crate::oracle::{Message, OracleBackend};

type Responder = dyn Fn(&str) -> Result<String, OracleError> + Send + Sync;

/// Mock 后端：responder 决定回复，prompts 记录调用
#[derive(Clone)]
pub struct MockBackend {
    responder: Arc<Responder>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockBackend {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<String, OracleError> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// 对任何 prompt 返回同一文本
    pub fn fixed(reply: impl Into<String>) -> Self {
        let reply = reply.into();
        Self::new(move |_| Ok(reply.clone()))
    }

    /// 对任何 prompt 返回错误
    pub fn failing(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(move |_| Err(OracleError::Unavailable(reason.clone())))
    }

    /// 已收到的 prompt（按调用顺序）
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }
}

#[async_trait]
impl OracleBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, OracleError> {
        let prompt = last_user_content(messages).to_string();
        if let Ok(mut log) = self.prompts.lock() {
            log.push(prompt.clone());
        }
        (self.responder)(&prompt)
    }
}
