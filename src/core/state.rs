//! Run 状态机
//!
//! planning → executing → verifying → {completed | planning | failed}；
//! executing 可因局部成功信号直接跳到 completed。终态不可离开。

use serde::Serialize;

/// 一次编排运行的阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Planning,
    Executing,
    Verifying,
    Completed,
    Failed,
}

impl RunStatus {
    /// 是否为终态
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    /// 状态机允许的迁移
    pub fn can_transition_to(self, next: RunStatus) -> bool {
        use RunStatus::{Completed, Executing, Failed, Planning, Verifying};
        matches!(
            (self, next),
            (Planning, Executing)
                | (Executing, Verifying)
                | (Executing, Completed)
                | (Verifying, Planning)
                | (Verifying, Completed)
                | (Verifying, Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Planning => "planning",
            RunStatus::Executing => "executing",
            RunStatus::Verifying => "verifying",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(RunStatus::Planning.can_transition_to(RunStatus::Executing));
        assert!(RunStatus::Executing.can_transition_to(RunStatus::Verifying));
        assert!(RunStatus::Executing.can_transition_to(RunStatus::Completed));
        assert!(RunStatus::Verifying.can_transition_to(RunStatus::Planning));
        assert!(RunStatus::Verifying.can_transition_to(RunStatus::Failed));
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        for next in [
            RunStatus::Planning,
            RunStatus::Executing,
            RunStatus::Verifying,
            RunStatus::Completed,
            RunStatus::Failed,
        ] {
            assert!(!RunStatus::Completed.can_transition_to(next));
            assert!(!RunStatus::Failed.can_transition_to(next));
        }
    }

    #[test]
    fn test_no_skipping_execution() {
        assert!(!RunStatus::Planning.can_transition_to(RunStatus::Verifying));
        assert!(!RunStatus::Planning.can_transition_to(RunStatus::Completed));
        assert!(!RunStatus::Executing.can_transition_to(RunStatus::Planning));
    }
}
