//! 核心编排层：错误、状态机、数据模型、策略标签、进度事件与主控循环

pub mod error;
pub mod events;
pub mod orchestrator;
pub mod state;
pub mod strategy;
pub mod types;

pub use error::{AuthenticationError, ForagerError, OracleError};
pub use events::RunEvent;
pub use orchestrator::{StrategyOrchestrator, DEFAULT_ATTEMPT_BUDGET};
pub use state::RunStatus;
pub use strategy::{normalize_label, StrategyBook, FALLBACK_STRATEGY};
pub use types::{Action, Goal, Run, Specialization, Step};
