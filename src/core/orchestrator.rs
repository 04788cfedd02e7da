//! Strategy Orchestrator：主控状态机
//!
//! 每个 attempt：planning → executing → verifying → {completed | planning | failed}。
//! executing 中 Action 严格顺序分发，失败只记为 Step 不中断；成功 Step 带本地信号时直接 completed。
//! 能力 panic 被 catch_unwind 捕获：记为失败 Step，跳过本 attempt 剩余 Action，本 attempt 记为验证失败。
//! Run 为显式值，编排器自身无可变状态，同一实例可并发服务多个目标。

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::OrchestratorSection;
use crate::core::events::send_event;
use crate::core::strategy::StrategyBook;
use crate::core::{ForagerError, Goal, Run, RunEvent, RunStatus};
use crate::oracle::OracleAdapter;
use crate::planning::prompts::strategy_prompt;
use crate::planning::{
    local_signal, short_circuit_confidence, ActionPlanner, GoalVerifier, PlanningContext, Verification,
};
use crate::tools::{ActionDispatcher, CapabilityRegistry};

/// 默认 attempt 预算
pub const DEFAULT_ATTEMPT_BUDGET: usize = 5;

pub struct StrategyOrchestrator {
    oracle: Arc<OracleAdapter>,
    settings: OrchestratorSection,
    dispatcher: ActionDispatcher,
    event_tx: Option<UnboundedSender<RunEvent>>,
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl StrategyOrchestrator {
    pub fn new(oracle: Arc<OracleAdapter>, settings: OrchestratorSection, dispatcher: ActionDispatcher) -> Self {
        Self {
            oracle,
            settings,
            dispatcher,
            event_tx: None,
        }
    }

    /// 附加进度事件通道（发送失败忽略）
    pub fn with_events(mut self, tx: UnboundedSender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn settings(&self) -> &OrchestratorSection {
        &self.settings
    }

    fn emit(&self, ev: RunEvent) {
        send_event(self.event_tx.as_ref(), ev);
    }

    fn set_status(&self, run: &mut Run, next: RunStatus) {
        if run.transition(next) {
            self.emit(RunEvent::StatusChanged { status: next });
        }
    }

    fn finish(&self, run: &Run) {
        tracing::info!(
            run_id = %run.id,
            status = %run.status,
            attempts = run.attempts,
            steps = run.steps.len(),
            confidence = ?run.confidence,
            "run finished"
        );
        self.emit(RunEvent::Finished {
            status: run.status,
            confidence: run.confidence,
        });
    }

    fn complete(&self, run: &mut Run, result: Option<serde_json::Value>, confidence: f64) {
        if run.complete(result, confidence) {
            self.emit(RunEvent::StatusChanged {
                status: RunStatus::Completed,
            });
        }
    }

    /// 对单个 Goal 执行完整编排，返回终态 Run（completed 或 failed）
    ///
    /// 能力返回 Err 只记为失败 Step 并继续；能力 panic 则结束当前 attempt（剩余 Action 跳过，记为验证失败）。
    pub async fn run_orchestration(&self, goal: Goal, registry: &CapabilityRegistry, attempt_budget: usize) -> Run {
        let budget = attempt_budget.max(1);
        let mut book = StrategyBook::new(self.settings.strategies.clone());
        let mut run = Run::new(goal, book.label_for(1));
        let planner = ActionPlanner::new(&self.oracle).with_capabilities(registry.descriptions());
        let verifier = GoalVerifier::new(&self.oracle).with_window(self.settings.verification_window);

        tracing::info!(
            run_id = %run.id,
            target = %run.goal.target,
            objective = %run.goal.objective,
            budget,
            oracle = %self.oracle.backend_name(),
            "run started"
        );

        for attempt in 1..=budget {
            if attempt > 1 {
                self.set_status(&mut run, RunStatus::Planning);
            }
            run.attempts = attempt;
            run.strategy = book.label_for(attempt).to_string();
            tracing::info!(run_id = %run.id, attempt, budget, strategy = %run.strategy, "attempt started");
            self.emit(RunEvent::AttemptStarted {
                attempt,
                budget,
                strategy: run.strategy.clone(),
            });

            let context = PlanningContext::new(attempt, budget, &run.strategy, &run.steps);
            let actions = planner.plan(&run.goal, &context).await;
            self.emit(RunEvent::ActionsPlanned {
                capabilities: actions.iter().map(|a| a.capability.clone()).collect(),
            });

            self.set_status(&mut run, RunStatus::Executing);
            let mut panicked = false;
            for action in actions {
                let name = action.capability.clone();
                let outcome = AssertUnwindSafe(self.dispatcher.execute(&action, registry))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| {
                        Err(ForagerError::CapabilityPanicked {
                            name: name.clone(),
                            message: panic_message(payload),
                        })
                    });
                panicked = outcome.as_ref().err().is_some_and(ForagerError::is_panic);

                let step = run.record_step(action, outcome).clone();
                if let Some(err) = &step.error {
                    tracing::warn!(run_id = %run.id, index = step.index, capability = %name, error = %err, "step failed");
                }
                self.emit(RunEvent::StepRecorded {
                    index: step.index,
                    capability: name,
                    succeeded: step.succeeded,
                    error: step.error.clone(),
                });

                if step.succeeded && step.result.as_ref().is_some_and(local_signal) {
                    let confidence = short_circuit_confidence(run.successful_steps(), run.steps.len());
                    tracing::info!(run_id = %run.id, index = step.index, confidence, "local signal, short-circuit");
                    self.emit(RunEvent::Verified {
                        success: true,
                        confidence,
                    });
                    self.complete(&mut run, step.result, confidence);
                    self.finish(&run);
                    return run;
                }
                if panicked {
                    tracing::warn!(run_id = %run.id, attempt, "capability panicked, skipping remaining actions");
                    break;
                }
            }

            self.set_status(&mut run, RunStatus::Verifying);
            let verification = if panicked {
                Verification {
                    success: false,
                    result: None,
                    confidence: 0.0,
                }
            } else {
                verifier.verify(&run.goal, &run.steps, true).await
            };
            self.emit(RunEvent::Verified {
                success: verification.success,
                confidence: verification.confidence,
            });

            if verification.success {
                self.complete(&mut run, verification.result, verification.confidence);
                self.finish(&run);
                return run;
            }
            tracing::info!(run_id = %run.id, attempt, "attempt did not reach the objective");

            if attempt < budget && self.settings.suggest_strategies {
                self.suggest_strategy(&mut book, &run, attempt).await;
            }
        }

        self.set_status(&mut run, RunStatus::Failed);
        self.finish(&run);
        run
    }

    /// 尽力而为：向 Oracle 询问下一次 attempt 的策略名，失败或空回复保留默认
    async fn suggest_strategy(&self, book: &mut StrategyBook, run: &Run, attempt: usize) {
        let prompt = strategy_prompt(
            &run.goal,
            &run.strategy,
            attempt,
            run.recent_steps(self.settings.verification_window.max(1)),
        );
        let answer = self.oracle.reason(&prompt, None).await;
        if answer.degraded {
            return;
        }
        if let Some(label) = book.apply_suggestion(attempt + 1, &answer.content) {
            tracing::info!(run_id = %run.id, next_attempt = attempt + 1, strategy = %label, "strategy suggested");
            self.emit(RunEvent::StrategySuggested {
                attempt: attempt + 1,
                strategy: label,
            });
        }
    }
}
