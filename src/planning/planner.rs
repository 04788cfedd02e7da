//! Action Planner：Goal + 上下文 → Oracle → 关键词规则 → Action 序列
//!
//! Oracle 调用成功时结果永不为空（无规则命中则产出 explore）；
//! Oracle 调用失败（降级回答）时返回固定的两步回退序列。

use crate::core::{Action, Goal};
use crate::oracle::OracleAdapter;
use crate::planning::prompts::{plan_prompt, PlanningContext};
use crate::planning::rules::{explore_action, fallback_actions, RuleSet};

/// 规划器：持有 Oracle 适配器的引用，无内部可变状态
pub struct ActionPlanner<'a> {
    oracle: &'a OracleAdapter,
    /// 注册能力的 (name, description)，嵌入 prompt 供 Oracle 参考
    capabilities: Vec<(String, String)>,
}

impl<'a> ActionPlanner<'a> {
    pub fn new(oracle: &'a OracleAdapter) -> Self {
        Self {
            oracle,
            capabilities: Vec::new(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Vec<(String, String)>) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// 规划下一批 Action
    pub async fn plan(&self, goal: &Goal, context: &PlanningContext) -> Vec<Action> {
        let prompt = plan_prompt(goal, context, &self.capabilities);
        let serialized = context.to_json();
        tracing::debug!(attempt = context.attempt, strategy = %context.strategy, "planning prompt built");

        let answer = self.oracle.reason(&prompt, Some(&serialized)).await;
        if answer.degraded {
            tracing::warn!(attempt = context.attempt, "planning oracle call failed, using fallback plan");
            return fallback_actions(goal);
        }

        let actions = Self::parse(goal, &answer.content);
        tracing::debug!(
            attempt = context.attempt,
            actions = ?actions.iter().map(|a| a.kind.as_str()).collect::<Vec<_>>(),
            "oracle text parsed"
        );
        actions
    }

    /// 将 Oracle 文本解析为 Action；保证非空
    pub fn parse(goal: &Goal, text: &str) -> Vec<Action> {
        let actions = RuleSet::for_specialization(goal.specialization).parse(goal, text);
        if actions.is_empty() {
            vec![explore_action(goal, text)]
        } else {
            actions
        }
    }
}
