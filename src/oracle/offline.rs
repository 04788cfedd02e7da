//! 离线启发式后端
//!
//! 无 API key 或 backend = "offline" 时使用。按 prompt 标题判断请求类型，
//! 返回固定措辞的自由文本，措辞中的关键词会触发规划规则，使运行在无推理服务时仍可推进。
//! 每条规划回复都同时触发网络捕获与标记分析两条规则；凭据类目标额外触发 secret 规则。

use async_trait::async_trait;

use crate::core::OracleError;
use crate::oracle::traits::last_user_content;
use crate::oracle::{Message, OracleBackend};
use crate::planning::prompts::{objective_of, PLAN_HEADER, STRATEGY_HEADER, VERIFY_HEADER};

const SECRET_PLAN: &str = "Offline heuristic: monitor network traffic, analyze the DOM elements, \
and scan the page source for exposed API keys and auth tokens. confidence: 0.4";
const API_PLAN: &str = "Offline heuristic: capture network traffic to enumerate the API endpoints, \
then analyze the DOM elements that trigger them. confidence: 0.4";
const DEFAULT_PLAN: &str =
    "Offline heuristic: monitor network traffic, then analyze the DOM and extract page elements. confidence: 0.4";
const VERIFY_REPLY: &str =
    "No: the offline heuristic cannot confirm the objective without a reasoning backend. confidence: 0.3";

const SECRET_WORDS: &[&str] = &["key", "token", "secret", "credential", "auth", "password"];
const API_WORDS: &[&str] = &["api", "endpoint", "request", "graphql", "rest"];

/// 离线启发式后端
#[derive(Debug, Default, Clone)]
pub struct OfflineHeuristic;

impl OfflineHeuristic {
    pub fn new() -> Self {
        Self
    }

    fn plan_reply(objective: &str) -> &'static str {
        let lower = objective.to_lowercase();
        if SECRET_WORDS.iter().any(|w| lower.contains(w)) {
            SECRET_PLAN
        } else if API_WORDS.iter().any(|w| lower.contains(w)) {
            API_PLAN
        } else {
            DEFAULT_PLAN
        }
    }

    /// 对单条 prompt 作答
    pub fn answer(prompt: &str) -> String {
        let prompt = prompt.trim_start();
        if prompt.starts_with(VERIFY_HEADER) {
            VERIFY_REPLY.to_string()
        } else if prompt.starts_with(STRATEGY_HEADER) {
            // 空回复：保留默认策略名
            String::new()
        } else if prompt.starts_with(PLAN_HEADER) {
            Self::plan_reply(objective_of(prompt).unwrap_or_default()).to_string()
        } else {
            DEFAULT_PLAN.to_string()
        }
    }
}

#[async_trait]
impl OracleBackend for OfflineHeuristic {
    fn name(&self) -> &str {
        "offline-heuristic"
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, OracleError> {
        Ok(Self::answer(last_user_content(messages)))
    }

    fn is_offline(&self) -> bool {
        true
    }
}
