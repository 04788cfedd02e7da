//! 关键词触发规则
//!
//! 规则按固定顺序逐条独立匹配 Oracle 文本（不互斥），每条命中产出一个 Action。
//! Specialization 只为对应规则追加关键词，不改变顺序。

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};

use crate::core::{Action, Goal, Specialization};
use crate::tools::{DOM_ANALYZER, ENDPOINT_SCRAPER, NETWORK_MONITOR, SCRIPT_INJECTOR, SECRET_SCANNER};

pub const KIND_NETWORK: &str = "network-capture";
pub const KIND_SCRIPT: &str = "script-injection";
pub const KIND_MARKUP: &str = "markup-analysis";
pub const KIND_SECRET: &str = "secret-discovery";
pub const KIND_EXPLORE: &str = "explore";

/// 未给出脚本时注入的默认探针：列出疑似配置/凭据的全局变量
pub const DEFAULT_PROBE_SCRIPT: &str =
    "JSON.stringify(Object.keys(window).filter(k => /api|key|token|config/i.test(k)))";

fn javascript_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:javascript|js)\s*\n(.*?)```").unwrap())
}

/// 单条规则：关键词命中则产出 kind/capability 对应的 Action
#[derive(Debug, Clone)]
pub struct ActionRule {
    pub kind: &'static str,
    pub capability: &'static str,
    keywords: Vec<&'static str>,
    pattern: Option<Regex>,
}

fn build_pattern(keywords: &[&str]) -> Option<Regex> {
    let alternation = keywords.join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).ok()
}

impl ActionRule {
    pub fn new(kind: &'static str, capability: &'static str, keywords: Vec<&'static str>) -> Self {
        let pattern = build_pattern(&keywords);
        Self {
            kind,
            capability,
            keywords,
            pattern,
        }
    }

    fn extend(&mut self, extra: &[&'static str]) {
        self.keywords.extend_from_slice(extra);
        self.pattern = build_pattern(&self.keywords);
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.as_ref().is_some_and(|p| p.is_match(text))
    }

    /// 产出 Action；参数至少含 url，脚本注入附带 script
    pub fn to_action(&self, goal: &Goal, text: &str) -> Action {
        let mut parameters = json!({ "url": goal.target });
        if self.kind == KIND_SCRIPT {
            let script = javascript_block_re()
                .captures(text)
                .map(|c| c[1].trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_PROBE_SCRIPT.to_string());
            parameters["script"] = Value::String(script);
        }
        Action {
            kind: self.kind.to_string(),
            capability: self.capability.to_string(),
            parameters,
            rationale: format!("oracle text mentions {} vocabulary", self.kind),
        }
    }
}

/// 有序规则集
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<ActionRule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::for_specialization(None)
    }
}

impl RuleSet {
    pub fn for_specialization(specialization: Option<Specialization>) -> Self {
        let mut network = ActionRule::new(KIND_NETWORK, NETWORK_MONITOR, vec!["network\\w*", "apis?", "endpoints?"]);
        let mut script = ActionRule::new(KIND_SCRIPT, SCRIPT_INJECTOR, vec!["scripts?", "inject\\w*", "javascript"]);
        let mut markup = ActionRule::new(KIND_MARKUP, DOM_ANALYZER, vec!["dom", "elements?", "extract\\w*"]);
        let mut secret = ActionRule::new(KIND_SECRET, SECRET_SCANNER, vec!["keys?", "tokens?", "auth\\w*"]);

        match specialization {
            Some(Specialization::ApiDiscovery) => {
                network.extend(&["graphql", "xhr", "fetch", "rest", "requests?"])
            }
            Some(Specialization::SecretDiscovery) => {
                secret.extend(&["secrets?", "credentials?", "passwords?", "apikey"])
            }
            Some(Specialization::ContentExtraction) => {
                markup.extend(&["selectors?", "forms?", "text", "content"])
            }
            Some(Specialization::ClientScripting) => {
                script.extend(&["console", "window", "runtime", "eval"])
            }
            None => {}
        }

        Self {
            rules: vec![network, script, markup, secret],
        }
    }

    pub fn rules(&self) -> &[ActionRule] {
        &self.rules
    }

    /// 按规则顺序解析文本；无命中时返回空
    pub fn parse(&self, goal: &Goal, text: &str) -> Vec<Action> {
        self.rules
            .iter()
            .filter(|r| r.matches(text))
            .map(|r| r.to_action(goal, text))
            .collect()
    }
}

/// 无规则命中时的探索 Action，rationale 为原始 Oracle 文本
pub fn explore_action(goal: &Goal, text: &str) -> Action {
    Action {
        kind: KIND_EXPLORE.to_string(),
        capability: ENDPOINT_SCRAPER.to_string(),
        parameters: json!({ "url": goal.target }),
        rationale: text.to_string(),
    }
}

/// Oracle 调用失败时的固定回退序列：先抓网络，再分析页面结构
pub fn fallback_actions(goal: &Goal) -> Vec<Action> {
    [(KIND_NETWORK, NETWORK_MONITOR), (KIND_MARKUP, DOM_ANALYZER)]
        .into_iter()
        .map(|(kind, capability)| Action {
            kind: kind.to_string(),
            capability: capability.to_string(),
            parameters: json!({ "url": goal.target }),
            rationale: "fallback plan: oracle unavailable".to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal() -> Goal {
        Goal::new("https://example.com", "x")
    }

    fn kinds(actions: &[Action]) -> Vec<&str> {
        actions.iter().map(|a| a.kind.as_str()).collect()
    }

    #[test]
    fn test_rules_are_independent_and_ordered() {
        let text = "Extract the auth token from the DOM, then watch the network for API calls.";
        let actions = RuleSet::default().parse(&goal(), text);
        assert_eq!(kinds(&actions), vec![KIND_NETWORK, KIND_MARKUP, KIND_SECRET]);
        assert!(actions.iter().all(|a| a.parameters["url"] == "https://example.com"));
    }

    #[test]
    fn test_word_boundaries() {
        // keyword / tokenize / domain 不应触发
        let actions = RuleSet::default().parse(&goal(), "Pick a keyword, tokenize it, check the domain.");
        assert!(actions.is_empty());
    }

    #[test]
    fn test_inflected_word_forms() {
        let rules = RuleSet::default();
        for (text, kind) in [
            ("Check the authentication headers.", KIND_SECRET),
            ("Inspect authorization flow.", KIND_SECRET),
            ("Review the page scripts.", KIND_SCRIPT),
            ("Look at the networking layer.", KIND_NETWORK),
        ] {
            assert_eq!(kinds(&rules.parse(&goal(), text)), vec![kind], "text {text:?}");
        }
    }

    #[test]
    fn test_script_block_is_extracted() {
        let text = "Inject this:\n```javascript\nwindow.__CONFIG__\n```";
        let actions = RuleSet::default().parse(&goal(), text);
        let script = actions.iter().find(|a| a.kind == KIND_SCRIPT).unwrap();
        assert_eq!(script.parameters["script"], "window.__CONFIG__");
        assert_eq!(script.capability, SCRIPT_INJECTOR);
    }

    #[test]
    fn test_script_default_probe() {
        let actions = RuleSet::default().parse(&goal(), "Run some JavaScript in the page.");
        assert_eq!(actions[0].parameters["script"], DEFAULT_PROBE_SCRIPT);
    }

    #[test]
    fn test_specialization_adds_keywords() {
        let text = "Look at the XHR traffic.";
        assert!(RuleSet::default().parse(&goal(), text).is_empty());
        let api = RuleSet::for_specialization(Some(Specialization::ApiDiscovery)).parse(&goal(), text);
        assert_eq!(kinds(&api), vec![KIND_NETWORK]);

        let creds = "Hunt for leaked credentials.";
        let secret = RuleSet::for_specialization(Some(Specialization::SecretDiscovery)).parse(&goal(), creds);
        assert_eq!(kinds(&secret), vec![KIND_SECRET]);
    }

    #[test]
    fn test_explore_and_fallback() {
        let explore = explore_action(&goal(), "I have no idea.");
        assert_eq!(explore.kind, KIND_EXPLORE);
        assert_eq!(explore.capability, ENDPOINT_SCRAPER);
        assert_eq!(explore.rationale, "I have no idea.");

        let fallback = fallback_actions(&goal());
        assert_eq!(kinds(&fallback), vec![KIND_NETWORK, KIND_MARKUP]);
    }
}
