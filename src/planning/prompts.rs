//! Prompt 模板
//!
//! 规划模板按 Specialization 选择（无专长时用通用模板），占位符单遍填充（填入的值不会再被展开）：
//! {target} {objective} {strategy} {attempt} {budget} {capabilities} {context}。
//! 每类 prompt 以固定标题行开头，离线启发式后端据此识别 prompt 类型。

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::Serialize;

use crate::core::{Goal, Specialization, Step};

pub const PLAN_HEADER: &str = "## Task: plan next actions";
pub const VERIFY_HEADER: &str = "## Task: verify objective";
pub const STRATEGY_HEADER: &str = "## Task: suggest strategy";
/// 各模板中 objective 所在行的前缀
pub const OBJECTIVE_PREFIX: &str = "Objective: ";

/// 结果预览最大字符数
const RESULT_PREVIEW_CHARS: usize = 300;

const GENERIC_TEMPLATE: &str = "## Task: plan next actions
You are directing a reconnaissance run against a web target.
Target: {target}
Objective: {objective}
Strategy: {strategy} (attempt {attempt} of {budget})

Available capabilities:
{capabilities}

Run context (JSON):
{context}

Describe in plain prose what should be done next. Say explicitly whether to watch network traffic and API endpoints,
inject a script, extract DOM elements, or search for keys and auth tokens. If a JavaScript snippet should be
injected, put it in a ```javascript block. Avoid repeating steps that already failed.";

const API_DISCOVERY_TEMPLATE: &str = "## Task: plan next actions
You are mapping the HTTP API surface of a web target.
Target: {target}
Objective: {objective}
Strategy: {strategy} (attempt {attempt} of {budget})

Focus on network requests, XHR/fetch calls, GraphQL and REST endpoints the page talks to.

Available capabilities:
{capabilities}

Run context (JSON):
{context}

Describe in plain prose what should be done next and which traffic or endpoints to look at.";

const SECRET_DISCOVERY_TEMPLATE: &str = "## Task: plan next actions
You are auditing a web target for exposed credentials.
Target: {target}
Objective: {objective}
Strategy: {strategy} (attempt {attempt} of {budget})

Focus on API keys, auth tokens, secrets and credentials leaked in page source, scripts or responses.

Available capabilities:
{capabilities}

Run context (JSON):
{context}

Describe in plain prose what should be done next and where keys or tokens are likely to be found.";

const CONTENT_EXTRACTION_TEMPLATE: &str = "## Task: plan next actions
You are extracting structured content from a web target.
Target: {target}
Objective: {objective}
Strategy: {strategy} (attempt {attempt} of {budget})

Focus on the DOM: which elements, forms, selectors and text to extract.

Available capabilities:
{capabilities}

Run context (JSON):
{context}

Describe in plain prose what should be done next and which elements to extract.";

const CLIENT_SCRIPTING_TEMPLATE: &str = "## Task: plan next actions
You are probing the client-side runtime of a web target.
Target: {target}
Objective: {objective}
Strategy: {strategy} (attempt {attempt} of {budget})

Focus on JavaScript executed in the page: globals on window, runtime configuration, console output.
Put any script to inject in a ```javascript block.

Available capabilities:
{capabilities}

Run context (JSON):
{context}

Describe in plain prose what should be done next.";

const VERIFY_TEMPLATE: &str = "## Task: verify objective
Target: {target}
Objective: {objective}

Outcome of the most recent steps:
{steps}

Has the objective been accomplished? Answer starting with Yes or No, then one sentence of justification,
and end with `confidence: <number between 0 and 1>`.";

const STRATEGY_TEMPLATE: &str = "## Task: suggest strategy
Target: {target}
Objective: {objective}
Strategy `{strategy}` failed on attempt {attempt}. Recent steps:
{steps}

Reply with a short kebab-case name for the next strategy to try (for example `passive-crawl`), nothing else.";

/// 规划上下文：序列化后嵌入规划 prompt，并作为 reason() 的 context 传入
#[derive(Debug, Clone, Serialize)]
pub struct PlanningContext {
    pub attempt: usize,
    pub budget: usize,
    pub strategy: String,
    pub previous_steps: Vec<StepSummary>,
}

/// Step 摘要（结果截断）
#[derive(Debug, Clone, Serialize)]
pub struct StepSummary {
    pub index: usize,
    pub capability: String,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_preview: Option<String>,
}

impl StepSummary {
    pub fn from_step(step: &Step) -> Self {
        Self {
            index: step.index,
            capability: step.action.capability.clone(),
            succeeded: step.succeeded,
            error: step.error.clone(),
            result_preview: step.result.as_ref().map(|r| preview(&r.to_string())),
        }
    }
}

impl PlanningContext {
    pub fn new(attempt: usize, budget: usize, strategy: &str, steps: &[Step]) -> Self {
        Self {
            attempt,
            budget,
            strategy: strategy.to_string(),
            previous_steps: steps.iter().map(StepSummary::from_step).collect(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

fn preview(s: &str) -> String {
    if s.chars().count() > RESULT_PREVIEW_CHARS {
        format!("{}...", s.chars().take(RESULT_PREVIEW_CHARS).collect::<String>())
    } else {
        s.to_string()
    }
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([a-z_]+)\}").unwrap())
}

/// 单遍替换模板中的占位符；未知占位符原样保留
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let values: HashMap<&str, &str> = values.iter().copied().collect();
    placeholder_re()
        .replace_all(template, |c: &Captures| {
            values
                .get(&c[1])
                .map(|v| v.to_string())
                .unwrap_or_else(|| c[0].to_string())
        })
        .into_owned()
}

/// 多行文本压成一行，保证 `Objective: ` 行包含完整 objective
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 按专长选择规划模板
pub fn template_for(specialization: Option<Specialization>) -> &'static str {
    match specialization {
        None => GENERIC_TEMPLATE,
        Some(Specialization::ApiDiscovery) => API_DISCOVERY_TEMPLATE,
        Some(Specialization::SecretDiscovery) => SECRET_DISCOVERY_TEMPLATE,
        Some(Specialization::ContentExtraction) => CONTENT_EXTRACTION_TEMPLATE,
        Some(Specialization::ClientScripting) => CLIENT_SCRIPTING_TEMPLATE,
    }
}

fn capability_lines(capabilities: &[(String, String)]) -> String {
    if capabilities.is_empty() {
        return "(none registered)".to_string();
    }
    capabilities
        .iter()
        .map(|(name, desc)| format!("- {name}: {desc}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn steps_block(steps: &[Step]) -> String {
    if steps.is_empty() {
        return "(no steps executed)".to_string();
    }
    steps
        .iter()
        .map(|s| {
            let outcome = match (&s.error, &s.result) {
                (Some(e), _) => format!("failed: {e}"),
                (None, Some(r)) => format!("ok: {}", preview(&r.to_string())),
                (None, None) => "ok".to_string(),
            };
            format!("{}. {} -> {}", s.index, s.action.capability, outcome)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// 构建规划 prompt
pub fn plan_prompt(goal: &Goal, context: &PlanningContext, capabilities: &[(String, String)]) -> String {
    let objective = single_line(&goal.objective);
    let attempt = context.attempt.to_string();
    let budget = context.budget.to_string();
    let capabilities = capability_lines(capabilities);
    let context_json = context.to_json();
    fill(
        template_for(goal.specialization),
        &[
            ("target", goal.target.as_str()),
            ("objective", objective.as_str()),
            ("strategy", context.strategy.as_str()),
            ("attempt", attempt.as_str()),
            ("budget", budget.as_str()),
            ("capabilities", capabilities.as_str()),
            ("context", context_json.as_str()),
        ],
    )
}

/// 构建验证 prompt（steps 为最近 N 条）
pub fn verification_prompt(goal: &Goal, steps: &[Step]) -> String {
    let objective = single_line(&goal.objective);
    let steps = steps_block(steps);
    fill(
        VERIFY_TEMPLATE,
        &[("target", goal.target.as_str()), ("objective", objective.as_str()), ("steps", steps.as_str())],
    )
}

/// 构建策略建议 prompt
pub fn strategy_prompt(goal: &Goal, failed_strategy: &str, attempt: usize, steps: &[Step]) -> String {
    let objective = single_line(&goal.objective);
    let attempt = attempt.to_string();
    let steps = steps_block(steps);
    fill(
        STRATEGY_TEMPLATE,
        &[
            ("target", goal.target.as_str()),
            ("objective", objective.as_str()),
            ("strategy", failed_strategy),
            ("attempt", attempt.as_str()),
            ("steps", steps.as_str()),
        ],
    )
}

/// 从 prompt 中取回 objective 行
pub fn objective_of(prompt: &str) -> Option<&str> {
    prompt
        .lines()
        .find_map(|l| l.strip_prefix(OBJECTIVE_PREFIX))
        .map(str::trim)
}
