//! 策略标签簿
//!
//! 按 attempt 序号（1 起始）取标签，超出列表长度时为 "fallback"。
//! Oracle 建议的标签替换下一个槽位；默认列表用尽时追加。标签只用于日志与下一次规划 prompt。

use std::sync::OnceLock;

use regex::Regex;

pub const FALLBACK_STRATEGY: &str = "fallback";
/// 规范化后标签的最大长度
pub const MAX_LABEL_LEN: usize = 40;

fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap())
}

/// 将 Oracle 建议的首行规范化为小写 kebab-case；结果为空则返回 None
pub fn normalize_label(raw: &str) -> Option<String> {
    let first = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let lowered = first.to_lowercase();
    let kebab = separator_re().replace_all(&lowered, "-");
    let mut label: String = kebab.trim_matches('-').chars().take(MAX_LABEL_LEN).collect();
    while label.ends_with('-') {
        label.pop();
    }
    (!label.is_empty()).then_some(label)
}

#[derive(Debug, Clone)]
pub struct StrategyBook {
    labels: Vec<String>,
}

impl StrategyBook {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// attempt 从 1 开始
    pub fn label_for(&self, attempt: usize) -> &str {
        attempt
            .checked_sub(1)
            .and_then(|i| self.labels.get(i))
            .map(String::as_str)
            .unwrap_or(FALLBACK_STRATEGY)
    }

    /// 用建议标签替换 next_attempt 的槽位；槽位不存在时追加。返回实际写入的标签
    pub fn apply_suggestion(&mut self, next_attempt: usize, suggestion: &str) -> Option<String> {
        let label = normalize_label(suggestion)?;
        let slot = next_attempt.saturating_sub(1);
        if slot < self.labels.len() {
            self.labels[slot] = label.clone();
        } else {
            self.labels.resize(slot, FALLBACK_STRATEGY.to_string());
            self.labels.push(label.clone());
        }
        Some(label)
    }
}
