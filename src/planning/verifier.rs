//! Goal Verifier：两级检查
//!
//! 1. 本地信号：不调用 Oracle，检查最近 Step 结果的 success / data / found 形状
//! 2. Oracle 验证：汇总最近 N（≤3）个 Step，询问是否达成 objective，解析肯定/否定措辞与置信度

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};

use crate::core::{Goal, Step};
use crate::oracle::OracleAdapter;
use crate::planning::prompts::verification_prompt;

/// 验证窗口上限
pub const MAX_VERIFICATION_WINDOW: usize = 3;
/// Oracle 调用完全失败时的置信度
pub const FAILED_CALL_CONFIDENCE: f64 = 0.5;

fn affirmative_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:yes|accomplished|success|successful|successfully|achieved)\b").unwrap()
    })
}

fn negation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:^\s*no\b|\bnot\s+(?:yet\s+)?(?:accomplished|successful|achieved)\b|\bno\s+success\b|\bunsuccessful)",
        )
        .unwrap()
    })
}

/// 验证结果
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Verification {
    pub success: bool,
    pub result: Option<Value>,
    pub confidence: f64,
}

/// 本地信号：非空，且 success == true，或 data / found 存在且不为 null / false
pub fn local_signal(result: &Value) -> bool {
    let non_empty = match result {
        Value::Null => false,
        Value::Object(m) => !m.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    };
    if !non_empty {
        return false;
    }
    let present = |key: &str| {
        result
            .get(key)
            .is_some_and(|v| !v.is_null() && v != &Value::Bool(false))
    };
    result.get("success") == Some(&Value::Bool(true)) || present("data") || present("found")
}

/// 本地短路时的置信度：min(0.95, 0.5 + 成功率 * 0.45)
pub fn short_circuit_confidence(successful: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.5;
    }
    (0.5 + (successful as f64 / total as f64) * 0.45).min(0.95)
}

/// 文本是否为未被否定的肯定回答
pub fn is_affirmative(text: &str) -> bool {
    !negation_re().is_match(text) && affirmative_re().is_match(text)
}

/// 验证器：持有 Oracle 适配器引用与窗口大小
pub struct GoalVerifier<'a> {
    oracle: &'a OracleAdapter,
    window: usize,
}

impl<'a> GoalVerifier<'a> {
    pub fn new(oracle: &'a OracleAdapter) -> Self {
        Self {
            oracle,
            window: MAX_VERIFICATION_WINDOW,
        }
    }

    /// 窗口夹到 [1, 3]
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.clamp(1, MAX_VERIFICATION_WINDOW);
        self
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// 检查 steps 是否已达成 goal；authoritative 为 true 时跳过本地信号，必问 Oracle
    pub async fn verify(&self, goal: &Goal, steps: &[Step], authoritative: bool) -> Verification {
        if !authoritative {
            if let Some(result) = steps
                .last()
                .filter(|s| s.succeeded)
                .and_then(|s| s.result.as_ref())
                .filter(|r| local_signal(r))
            {
                let successful = steps.iter().filter(|s| s.succeeded).count();
                return Verification {
                    success: true,
                    result: Some(result.clone()),
                    confidence: short_circuit_confidence(successful, steps.len()),
                };
            }
        }

        let recent = &steps[steps.len().saturating_sub(self.window)..];
        let prompt = verification_prompt(goal, recent);
        let answer = self.oracle.reason(&prompt, None).await;

        if answer.degraded {
            tracing::warn!("verification oracle call failed");
            return Verification {
                success: false,
                result: None,
                confidence: FAILED_CALL_CONFIDENCE,
            };
        }

        let success = is_affirmative(&answer.verdict) || is_affirmative(&answer.content);
        let result = success.then(|| {
            steps
                .iter()
                .rev()
                .filter(|s| s.succeeded)
                .find_map(|s| s.result.clone())
                .unwrap_or_else(|| json!({ "verdict": answer.content }))
        });
        tracing::debug!(success, confidence = answer.confidence, "verification parsed");
        Verification {
            success,
            result,
            confidence: answer.confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::core::Action;
    use crate::oracle::MockBackend;

    fn step(index: usize, result: Option<Value>) -> Step {
        Step {
            index,
            action: Action {
                kind: "markup-analysis".to_string(),
                capability: "dom-analyzer".to_string(),
                parameters: json!({"url": "https://example.com"}),
                rationale: String::new(),
            },
            succeeded: result.is_some(),
            error: result.is_none().then(|| "boom".to_string()),
            result,
            attempt: 1,
        }
    }

    fn adapter(mock: MockBackend) -> OracleAdapter {
        OracleAdapter::with_backend(Arc::new(mock), Duration::from_secs(5))
    }

    #[test]
    fn test_local_signal_shapes() {
        assert!(local_signal(&json!({"success": true})));
        assert!(local_signal(&json!({"data": {"requests": []}})));
        assert!(local_signal(&json!({"found": ["x"]})));
        assert!(!local_signal(&json!({"success": false})));
        assert!(!local_signal(&json!({"data": null})));
        assert!(!local_signal(&json!({"found": false})));
        assert!(!local_signal(&json!({})));
        assert!(!local_signal(&Value::Null));
        assert!(!local_signal(&json!("ok")));
    }

    #[test]
    fn test_short_circuit_confidence() {
        assert!((short_circuit_confidence(1, 1) - 0.95).abs() < 1e-9);
        assert!((short_circuit_confidence(1, 2) - 0.725).abs() < 1e-9);
        assert_eq!(short_circuit_confidence(0, 0), 0.5);
    }

    #[test]
    fn test_affirmative_parsing() {
        assert!(is_affirmative("Yes, the objective was accomplished."));
        assert!(is_affirmative("The run was successful"));
        assert!(!is_affirmative("No: nothing was found"));
        assert!(!is_affirmative("The objective was not accomplished"));
        assert!(!is_affirmative("Unsuccessful attempt"));
        assert!(!is_affirmative("There was no success"));
        assert!(!is_affirmative("Partially done"));
    }

    #[tokio::test]
    async fn test_local_signal_skips_oracle() {
        let mock = MockBackend::fixed("Yes");
        let oracle = adapter(mock.clone());
        let steps = vec![step(1, None), step(2, Some(json!({"found": ["k"]})))];
        let v = GoalVerifier::new(&oracle).verify(&Goal::new("t", "o"), &steps, false).await;
        assert!(v.success);
        assert!((v.confidence - 0.725).abs() < 1e-9);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_oracle_verdict_with_window() {
        let mock = MockBackend::fixed("Yes, accomplished. confidence: 0.9");
        let oracle = adapter(mock.clone());
        let steps: Vec<_> = (1..=5).map(|i| step(i, Some(json!({"status": i})))).collect();
        let v = GoalVerifier::new(&oracle)
            .with_window(10)
            .verify(&Goal::new("t", "o"), &steps, true)
            .await;
        assert!(v.success);
        assert!((v.confidence - 0.9).abs() < 1e-9);
        assert_eq!(v.result, Some(json!({"status": 5})));
        let prompt = &mock.prompts()[0];
        assert!(prompt.contains("3. dom-analyzer"));
        assert!(prompt.contains("5. dom-analyzer"));
        assert!(!prompt.contains("2. dom-analyzer"));
    }

    #[tokio::test]
    async fn test_negative_verdict() {
        let oracle = adapter(MockBackend::fixed("No, the objective was not achieved. confidence: 0.2"));
        let v = GoalVerifier::new(&oracle)
            .verify(&Goal::new("t", "o"), &[step(1, None)], false)
            .await;
        assert!(!v.success);
        assert!(v.result.is_none());
        assert!((v.confidence - 0.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_failed_call_confidence() {
        let oracle = adapter(MockBackend::failing("timeout"));
        let v = GoalVerifier::new(&oracle)
            .verify(&Goal::new("t", "o"), &[step(1, None)], false)
            .await;
        assert!(!v.success);
        assert_eq!(v.confidence, FAILED_CALL_CONFIDENCE);
    }
}
