//! Forager - 目标驱动的 Web 侦察编排器
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 数据模型、状态机、策略标签、进度事件与主控编排循环
//! - **observability**: tracing 日志初始化
//! - **oracle**: 推理 Oracle 适配层（OpenAI 兼容 / DeepSeek / 离线启发式 / Mock）
//! - **planning**: prompt 模板、关键词规则、Action Planner 与 Goal Verifier
//! - **tools**: Capability trait、注册表、分发器与内置 HTTP 能力

pub mod config;
pub mod core;
pub mod observability;
pub mod oracle;
pub mod planning;
pub mod tools;

pub use crate::core::{Goal, Run, RunStatus, StrategyOrchestrator};
