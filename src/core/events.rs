//! 编排过程事件：供 CLI / 宿主展示 attempt、状态变化、Step 与验证结果

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::core::state::RunStatus;

/// 单步过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// 新 attempt 开始
    AttemptStarted {
        attempt: usize,
        budget: usize,
        strategy: String,
    },
    StatusChanged { status: RunStatus },
    /// Planner 产出的 Action（能力名列表）
    ActionsPlanned { capabilities: Vec<String> },
    /// 记录了一条 Step
    StepRecorded {
        index: usize,
        capability: String,
        succeeded: bool,
        error: Option<String>,
    },
    /// 验证结果
    Verified { success: bool, confidence: f64 },
    /// Oracle 为下一次 attempt 建议的策略名
    StrategySuggested { attempt: usize, strategy: String },
    /// 运行结束
    Finished {
        status: RunStatus,
        confidence: Option<f64>,
    },
}

pub(crate) fn send_event(tx: Option<&UnboundedSender<RunEvent>>, ev: RunEvent) {
    if let Some(t) = tx {
        let _ = t.send(ev);
    }
}
