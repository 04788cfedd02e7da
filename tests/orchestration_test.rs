//! 编排器集成测试：脚本化 Oracle（MockBackend）+ 测试内能力实现

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use forager::config::OrchestratorSection;
use forager::core::{Goal, Run, RunStatus, StrategyOrchestrator};
use forager::oracle::{MockBackend, OracleAdapter};
use forager::planning::prompts::{PlanningContext, PLAN_HEADER, STRATEGY_HEADER, VERIFY_HEADER};
use forager::planning::ActionPlanner;
use forager::tools::{ActionDispatcher, Capability, CapabilityRegistry};

/// 返回固定结果并计数的能力
struct Scripted {
    name: &'static str,
    result: Result<Value, String>,
    calls: Arc<AtomicUsize>,
}

impl Scripted {
    fn ok(name: &'static str, value: Value) -> Self {
        Self {
            name,
            result: Ok(value),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn err(name: &'static str, reason: &str) -> Self {
        Self {
            name,
            result: Err(reason.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Capability for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "scripted test capability"
    }

    async fn execute(&self, _params: Value) -> Result<Value, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

fn orchestrator(mock: MockBackend) -> StrategyOrchestrator {
    let oracle = OracleAdapter::with_backend(Arc::new(mock), Duration::from_secs(5));
    StrategyOrchestrator::new(
        Arc::new(oracle),
        OrchestratorSection::default(),
        ActionDispatcher::with_timeout(Duration::from_secs(5)),
    )
}

fn goal() -> Goal {
    Goal::new("https://example.com", "Find all API endpoints")
}

/// 规划回复 planning，验证总是否定，策略建议为空
fn never_succeeds(planning: &'static str) -> MockBackend {
    MockBackend::new(move |prompt| {
        if prompt.starts_with(VERIFY_HEADER) {
            Ok("No, not accomplished. confidence: 0.2".to_string())
        } else if prompt.starts_with(STRATEGY_HEADER) {
            Ok(String::new())
        } else {
            Ok(planning.to_string())
        }
    })
}

fn assert_status_path(run: &Run) {
    assert_eq!(run.status_history.first(), Some(&RunStatus::Planning));
    for pair in run.status_history.windows(2) {
        assert!(
            pair[0].can_transition_to(pair[1]),
            "illegal transition {} -> {}",
            pair[0],
            pair[1]
        );
    }
    let terminal = run.status_history.iter().filter(|s| s.is_terminal()).count();
    assert_eq!(terminal, 1);
    assert!(run.status_history.last().is_some_and(|s| s.is_terminal()));
}

fn assert_indices(run: &Run) {
    for (i, step) in run.steps.iter().enumerate() {
        assert_eq!(step.index, i + 1);
    }
}

#[tokio::test]
async fn test_never_empty_planning() {
    for reply in ["", "   ", "Nothing useful to say.", "Watch the network and inject a script."] {
        let oracle = OracleAdapter::with_backend(Arc::new(MockBackend::fixed(reply)), Duration::from_secs(5));
        let ctx = PlanningContext::new(1, 5, "primary", &[]);
        let actions = ActionPlanner::new(&oracle).plan(&goal(), &ctx).await;
        assert!(!actions.is_empty(), "empty plan for reply {reply:?}");
        assert!(actions.iter().all(|a| a.parameters["url"] == "https://example.com"));
    }
}

#[tokio::test]
async fn test_partial_failure_tolerance() {
    let network = Scripted::ok("network-monitor", json!({"status": 200}));
    let script = Scripted::err("script-injector", "page crashed");
    let dom = Scripted::ok("dom-analyzer", json!({"analysis": {"title": "x"}}));
    let (net_calls, dom_calls) = (network.calls.clone(), dom.calls.clone());

    let mut registry = CapabilityRegistry::new();
    registry.register(network);
    registry.register(script);
    registry.register(dom);

    let run = orchestrator(never_succeeds("Capture the network, inject a script, then read the DOM."))
        .run_orchestration(goal(), &registry, 1)
        .await;

    assert_eq!(run.steps.len(), 3);
    assert!(run.steps[0].succeeded);
    assert!(!run.steps[1].succeeded);
    assert!(run.steps[1].error.as_deref().unwrap().contains("page crashed"));
    assert!(run.steps[2].succeeded);
    assert_eq!(net_calls.load(Ordering::SeqCst), 1);
    assert_eq!(dom_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_budget_respected_and_indices_monotonic() {
    for budget in [1, 3, 5] {
        let mock = never_succeeds("Capture the network.");
        let run = orchestrator(mock.clone())
            .run_orchestration(goal(), &CapabilityRegistry::new(), budget)
            .await;
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.attempts, budget);
        assert_eq!(run.steps.len(), budget);
        assert_eq!(run.steps.last().map(|s| s.attempt), Some(budget));
        assert!(run.result.is_none());
        assert!(run.confidence.is_none());
        assert_indices(&run);
        assert_status_path(&run);
        let plans = mock.prompts().iter().filter(|p| p.starts_with(PLAN_HEADER)).count();
        assert_eq!(plans, budget);
    }
}

#[tokio::test]
async fn test_confidence_bounds() {
    for reply in ["Yes, accomplished. confidence: 250", "Yes. {\"confidence\": -3}", "Yes, success."] {
        let mock = MockBackend::fixed(reply);
        let run = orchestrator(mock)
            .run_orchestration(goal(), &CapabilityRegistry::new(), 2)
            .await;
        assert_eq!(run.status, RunStatus::Completed);
        let c = run.confidence.unwrap();
        assert!((0.0..=1.0).contains(&c), "confidence {c} out of bounds");
        assert_status_path(&run);
    }
}

#[tokio::test]
async fn test_scenario_a_endpoint_objective_verified() {
    let mock = MockBackend::new(|prompt| {
        if prompt.starts_with(VERIFY_HEADER) {
            Ok("Yes, the objective was accomplished.\nconfidence: 0.8".to_string())
        } else {
            Ok("Enumerate every endpoint the page calls.".to_string())
        }
    });
    let mut registry = CapabilityRegistry::new();
    registry.register(Scripted::ok("network-monitor", json!({"status": 200, "requests": 0})));

    let run = orchestrator(mock).run_orchestration(goal(), &registry, 5).await;

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.attempts, 1);
    assert_eq!(run.steps.len(), 1);
    assert_eq!(run.steps[0].action.kind, "network-capture");
    assert!((run.confidence.unwrap() - 0.8).abs() < 1e-9);
    assert_eq!(run.result, Some(json!({"status": 200, "requests": 0})));
}

#[tokio::test]
async fn test_scenario_b_oracle_unavailable() {
    let mock = MockBackend::failing("no credentials");
    let run = orchestrator(mock.clone())
        .run_orchestration(goal(), &CapabilityRegistry::new(), 5)
        .await;

    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.attempts, 5);
    assert_eq!(run.steps.len(), 10);
    for pair in run.steps.chunks(2) {
        assert_eq!(pair[0].action.kind, "network-capture");
        assert_eq!(pair[1].action.kind, "markup-analysis");
    }
    assert_indices(&run);
    assert_eq!(run.strategy, "deep-analysis");
}

#[tokio::test]
async fn test_scenario_b_offline_heuristic() {
    let oracle = OracleAdapter::offline();
    let orchestrator = StrategyOrchestrator::new(
        Arc::new(oracle),
        OrchestratorSection::default(),
        ActionDispatcher::with_timeout(Duration::from_secs(5)),
    );
    let goal = Goal::new("https://example.com", "Summarize what the landing page offers");
    let run = orchestrator
        .run_orchestration(goal, &CapabilityRegistry::new(), 5)
        .await;

    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.steps.len(), 10);
    assert!(run.steps.iter().all(|s| !s.succeeded));
    assert_status_path(&run);
}

#[tokio::test]
async fn test_scenario_b_offline_heuristic_api_objective() {
    let orchestrator = StrategyOrchestrator::new(
        Arc::new(OracleAdapter::offline()),
        OrchestratorSection::default(),
        ActionDispatcher::with_timeout(Duration::from_secs(5)),
    );
    let run = orchestrator
        .run_orchestration(goal(), &CapabilityRegistry::new(), 5)
        .await;

    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.attempts, 5);
    assert_eq!(run.steps.len(), 10);
    for pair in run.steps.chunks(2) {
        assert_eq!(pair[0].action.kind, "network-capture");
        assert_eq!(pair[1].action.kind, "markup-analysis");
    }
    assert!(run.steps.iter().all(|s| !s.succeeded));
    assert_indices(&run);
    assert_status_path(&run);
}

#[tokio::test]
async fn test_scenario_c_missing_capability() {
    let dom = Scripted::ok("dom-analyzer", json!({"analysis": {}}));
    let dom_calls = dom.calls.clone();
    let mut registry = CapabilityRegistry::new();
    registry.register(dom);

    let run = orchestrator(never_succeeds("Capture network traffic, then extract DOM elements."))
        .run_orchestration(goal(), &registry, 1)
        .await;

    assert_eq!(run.steps.len(), 2);
    let missing = &run.steps[0];
    assert_eq!(missing.action.capability, "network-monitor");
    assert!(!missing.succeeded);
    let err = missing.error.as_deref().unwrap();
    assert!(err.contains("not found") && err.contains("not available"));
    assert!(run.steps[1].succeeded);
    assert_eq!(dom_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_runs_share_registry_and_oracle() {
    let mut registry = CapabilityRegistry::new();
    registry.register(Scripted::ok("network-monitor", json!({"found": ["/api/v1/users"]})));
    let registry = Arc::new(registry);
    let orchestrator = Arc::new(orchestrator(MockBackend::fixed("Capture the network.")));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let registry = registry.clone();
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                let goal = Goal::new(format!("https://site{i}.example"), "Find all API endpoints");
                orchestrator.run_orchestration(goal, &registry, 3).await
            })
        })
        .collect();

    let mut ids = std::collections::HashSet::new();
    for h in handles {
        let run = h.await.unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.steps.len(), 1);
        ids.insert(run.id);
    }
    assert_eq!(ids.len(), 4);
}
