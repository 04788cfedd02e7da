//! 规划层：prompt 模板、关键词规则、Action Planner 与 Goal Verifier

pub mod planner;
pub mod prompts;
pub mod rules;
pub mod verifier;

pub use planner::ActionPlanner;
pub use prompts::PlanningContext;
pub use rules::{ActionRule, RuleSet};
pub use verifier::{is_affirmative, local_signal, short_circuit_confidence, GoalVerifier, Verification};
