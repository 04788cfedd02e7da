//! Action 分发器
//!
//! 在注册表中解析 action.capability 并以 action.parameters 调用；对每次调用施加宿主给定的超时，
//! 结果原样返回，失败映射为 ForagerError（CapabilityNotFound / CapabilityFailed / CapabilityTimeout）。
//! 不吞错：失败由 Orchestrator 记为 Step。每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::time::timeout;

use crate::core::{Action, ForagerError};
use crate::tools::CapabilityRegistry;

/// 分发器：无状态，仅持有单次能力调用超时
#[derive(Debug, Clone)]
pub struct ActionDispatcher {
    timeout: Duration,
}

impl ActionDispatcher {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs.max(1)),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// 执行 Action；能力不存在时直接返回 CapabilityNotFound
    pub async fn execute(
        &self,
        action: &Action,
        registry: &CapabilityRegistry,
    ) -> Result<Value, ForagerError> {
        let start = Instant::now();
        let params_preview = params_preview(&action.parameters);
        let capability = match registry.resolve(&action.capability) {
            Ok(c) => c,
            Err(e) => {
                audit(&action.capability, false, "not_found", start, &params_preview);
                return Err(e);
            }
        };

        let result = timeout(self.timeout, capability.execute(action.parameters.clone())).await;

        let outcome = match &result {
            Ok(Ok(_)) => "ok",
            Ok(Err(_)) => "error",
            Err(_) => "timeout",
        };
        audit(&action.capability, outcome == "ok", outcome, start, &params_preview);

        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(reason)) => Err(ForagerError::CapabilityFailed {
                name: action.capability.clone(),
                reason,
            }),
            Err(_) => Err(ForagerError::CapabilityTimeout(action.capability.clone())),
        }
    }
}

impl Default for ActionDispatcher {
    fn default() -> Self {
        Self::new(30)
    }
}

fn audit(capability: &str, ok: bool, outcome: &str, start: Instant, params_preview: &str) {
    let audit = serde_json::json!({
        "event": "capability_audit",
        "capability": capability,
        "ok": ok,
        "outcome": outcome,
        "duration_ms": start.elapsed().as_millis() as u64,
        "params_preview": params_preview,
    });
    tracing::info!(audit = %audit.to_string(), "capability");
}

fn params_preview(params: &Value) -> String {
    let s = params.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Capability;
    use async_trait::async_trait;

    struct Slow;

    #[async_trait]
    impl Capability for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "sleeps"
        }

        async fn execute(&self, _params: Value) -> Result<Value, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Value::Null)
        }
    }

    struct Broken;

    #[async_trait]
    impl Capability for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "always fails"
        }

        async fn execute(&self, _params: Value) -> Result<Value, String> {
            Err("page unreachable".to_string())
        }
    }

    fn action(cap: &str) -> Action {
        Action {
            kind: "explore".to_string(),
            capability: cap.to_string(),
            parameters: serde_json::json!({"url": "https://example.com"}),
            rationale: String::new(),
        }
    }

    #[tokio::test]
    async fn test_missing_capability() {
        let dispatcher = ActionDispatcher::default();
        let err = dispatcher
            .execute(&action("network-monitor"), &CapabilityRegistry::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ForagerError::CapabilityNotFound(_)));
    }

    #[tokio::test]
    async fn test_failure_is_mapped() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Broken);
        let err = ActionDispatcher::default()
            .execute(&action("broken"), &registry)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ForagerError::CapabilityFailed {
                name: "broken".to_string(),
                reason: "page unreachable".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_timeout() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Slow);
        let err = ActionDispatcher::with_timeout(Duration::from_millis(20))
            .execute(&action("slow"), &registry)
            .await
            .unwrap_err();
        assert!(matches!(err, ForagerError::CapabilityTimeout(_)));
    }

    #[test]
    fn test_params_preview_truncates() {
        let long = serde_json::json!({ "script": "x".repeat(500) });
        let preview = params_preview(&long);
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 203);
    }
}
