//! 从 Oracle 自由文本中恢复置信度
//!
//! 顺序：嵌入的 JSON 片段中的 confidence 字段 → `confidence` 关键词后的数字 → 默认 0.7。
//! 大于 1 的值按百分比处理；最终夹到 [0, 1]。

use std::sync::OnceLock;

use regex::Regex;

/// 无法恢复时的默认置信度
pub const DEFAULT_CONFIDENCE: f64 = 0.7;

fn keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)confidence[^0-9\n]{0,16}?(\d+(?:\.\d+)?)").unwrap())
}

/// 提取文本中的 JSON 片段（```json ... ``` 或第一个 `{` 到最后一个 `}`）
pub fn extract_json_fragment(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

fn from_json(text: &str) -> Option<f64> {
    let fragment = extract_json_fragment(text)?;
    let value: serde_json::Value = serde_json::from_str(fragment).ok()?;
    match value.get("confidence")? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    }
}

fn from_keyword(text: &str) -> Option<f64> {
    keyword_re()
        .captures(text)
        .and_then(|c| c[1].parse::<f64>().ok())
}

/// 将原始数值规范化：>1 视为百分比，再夹到 [0,1]
pub fn normalize(raw: f64) -> f64 {
    if !raw.is_finite() {
        return DEFAULT_CONFIDENCE;
    }
    let v = if raw > 1.0 { raw / 100.0 } else { raw };
    v.clamp(0.0, 1.0)
}

/// 从文本恢复置信度
pub fn extract_confidence(text: &str) -> f64 {
    from_json(text)
        .or_else(|| from_keyword(text))
        .map(normalize)
        .unwrap_or(DEFAULT_CONFIDENCE)
}
