//! 数据模型：Goal / Action / Step / Run
//!
//! Run 是显式传递的值：每次编排调用独占一个 Run，不在并发目标之间共享。
//! Step 只追加，index 在追加时按 1 起始分配，跨 attempt 不重置。

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::core::error::ForagerError;
use crate::core::state::RunStatus;

/// 目标专长：决定 Planner 使用的 prompt 模板与关键词权重
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Specialization {
    ApiDiscovery,
    SecretDiscovery,
    ContentExtraction,
    ClientScripting,
}

impl Specialization {
    pub fn as_str(self) -> &'static str {
        match self {
            Specialization::ApiDiscovery => "api-discovery",
            Specialization::SecretDiscovery => "secret-discovery",
            Specialization::ContentExtraction => "content-extraction",
            Specialization::ClientScripting => "client-scripting",
        }
    }
}

impl std::fmt::Display for Specialization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Specialization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "api-discovery" | "api" => Ok(Specialization::ApiDiscovery),
            "secret-discovery" | "secrets" => Ok(Specialization::SecretDiscovery),
            "content-extraction" | "content" => Ok(Specialization::ContentExtraction),
            "client-scripting" | "scripting" => Ok(Specialization::ClientScripting),
            other => Err(format!("Unknown specialization: {other}")),
        }
    }
}

/// 运行目标：target URI + 自然语言 objective；一次运行内不可变
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Goal {
    pub target: String,
    pub objective: String,
    pub specialization: Option<Specialization>,
}

impl Goal {
    pub fn new(target: impl Into<String>, objective: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            objective: objective.into(),
            specialization: None,
        }
    }

    pub fn with_specialization(mut self, specialization: Specialization) -> Self {
        self.specialization = Some(specialization);
        self
    }
}

/// Planner 产出的结构化意图：按名字引用能力，不持有能力本身
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: String,
    pub capability: String,
    pub parameters: Value,
    pub rationale: String,
}

/// 一次 Action 分发的记录
#[derive(Clone, Debug, Serialize)]
pub struct Step {
    /// 1 起始，在 Run 内单调递增
    pub index: usize,
    pub action: Action,
    pub result: Option<Value>,
    pub succeeded: bool,
    pub error: Option<String>,
    /// 产生该 Step 的 attempt（1 起始）
    pub attempt: usize,
}

/// 一次编排运行（Execution）
#[derive(Clone, Debug, Serialize)]
pub struct Run {
    pub id: Uuid,
    pub goal: Goal,
    pub steps: Vec<Step>,
    pub strategy: String,
    pub status: RunStatus,
    /// 已开始的 attempt 数
    pub attempts: usize,
    pub result: Option<Value>,
    pub confidence: Option<f64>,
    /// 经历过的所有状态（含初始 planning）
    pub status_history: Vec<RunStatus>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Run {
    pub fn new(goal: Goal, strategy: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            goal,
            steps: Vec::new(),
            strategy: strategy.into(),
            status: RunStatus::Planning,
            attempts: 0,
            result: None,
            confidence: None,
            status_history: vec![RunStatus::Planning],
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// 迁移到下一个状态；非法迁移被拒绝并返回 false
    pub fn transition(&mut self, next: RunStatus) -> bool {
        if !self.status.can_transition_to(next) {
            tracing::error!(
                run_id = %self.id,
                from = %self.status,
                to = %next,
                "illegal run status transition refused"
            );
            return false;
        }
        self.status = next;
        self.status_history.push(next);
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        true
    }

    /// 追加一条 Step，index 取当前长度 + 1
    pub fn record_step(&mut self, action: Action, outcome: Result<Value, ForagerError>) -> &Step {
        let index = self.steps.len() + 1;
        let step = match outcome {
            Ok(result) => Step {
                index,
                action,
                result: Some(result),
                succeeded: true,
                error: None,
                attempt: self.attempts,
            },
            Err(e) => Step {
                index,
                action,
                result: None,
                succeeded: false,
                error: Some(e.to_string()),
                attempt: self.attempts,
            },
        };
        self.steps.push(step);
        &self.steps[index - 1]
    }

    pub fn successful_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.succeeded).count()
    }

    /// 最近 n 条 Step（按原顺序）
    pub fn recent_steps(&self, n: usize) -> &[Step] {
        let start = self.steps.len().saturating_sub(n);
        &self.steps[start..]
    }

    /// 以结果与置信度进入 completed（置信度被夹到 [0,1]）
    pub fn complete(&mut self, result: Option<Value>, confidence: f64) -> bool {
        if !self.transition(RunStatus::Completed) {
            return false;
        }
        self.result = result;
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        true
    }
}
