//! dom-analyzer：标记分析
//!
//! 抓取页面后用正则提取 title、表单、输入框、链接、脚本，并用 html2text 生成可读文本摘要；
//! selectors（标签名）可限定要统计的元素。

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::http::{html_to_text, looks_like_html, resolve_url, script_sources, PageFetcher};
use crate::tools::schema::{params_schema, parse_params};
use crate::tools::Capability;

pub const DOM_ANALYZER: &str = "dom-analyzer";

/// 可读文本摘要最大字符数
const TEXT_EXCERPT_CHARS: usize = 2000;
/// 单类元素最多列出条数
const MAX_ELEMENTS: usize = 100;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DomAnalyzerParams {
    /// 目标页面 URL
    pub url: String,
    /// 需要统计的标签名（如 form、input、iframe）；为空时统计全部默认类别
    #[serde(default)]
    pub selectors: Vec<String>,
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap())
}

fn tag_re(tag: &str) -> Option<Regex> {
    let tag = regex::escape(tag.trim().trim_start_matches('<').trim_end_matches('>'));
    if tag.is_empty() {
        return None;
    }
    Regex::new(&format!(r"(?i)<{tag}\b[^>]*>")).ok()
}

/// 从单个标签源码中取属性值
pub fn attr(tag_src: &str, name: &str) -> Option<String> {
    let re = Regex::new(&format!(
        r#"(?i)\b{}\s*=\s*["']([^"']*)["']"#,
        regex::escape(name)
    ))
    .ok()?;
    re.captures(tag_src).map(|c| c[1].to_string())
}

/// 页面结构摘要
pub fn analyze_markup(html: &str, base: &str, selectors: &[String]) -> Value {
    let title = title_re()
        .captures(html)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_default();

    let tags_of = |tag: &str| -> Vec<String> {
        tag_re(tag)
            .map(|re| {
                re.find_iter(html)
                    .take(MAX_ELEMENTS)
                    .map(|m| m.as_str().to_string())
                    .collect()
            })
            .unwrap_or_default()
    };

    let forms: Vec<Value> = tags_of("form")
        .iter()
        .map(|t| {
            serde_json::json!({
                "action": attr(t, "action").map(|a| resolve_url(base, &a)),
                "method": attr(t, "method").unwrap_or_else(|| "get".to_string()).to_lowercase(),
            })
        })
        .collect();
    let inputs: Vec<Value> = tags_of("input")
        .iter()
        .map(|t| {
            serde_json::json!({
                "name": attr(t, "name"),
                "type": attr(t, "type").unwrap_or_else(|| "text".to_string()).to_lowercase(),
            })
        })
        .collect();
    let links: Vec<String> = tags_of("a")
        .iter()
        .filter_map(|t| attr(t, "href"))
        .filter(|h| !h.starts_with('#') && !h.to_lowercase().starts_with("javascript:"))
        .map(|h| resolve_url(base, &h))
        .collect();
    let scripts = script_sources(html, base);

    let mut counts = serde_json::Map::new();
    for sel in selectors {
        counts.insert(sel.clone(), Value::from(tags_of(sel).len()));
    }

    serde_json::json!({
        "title": title,
        "forms": forms,
        "inputs": inputs,
        "links": links,
        "scripts": scripts,
        "selector_counts": counts,
    })
}

/// 标记分析能力
pub struct DomAnalyzer {
    fetcher: PageFetcher,
}

impl DomAnalyzer {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Capability for DomAnalyzer {
    fn name(&self) -> &str {
        DOM_ANALYZER
    }

    fn description(&self) -> &str {
        "Analyze page markup: title, forms, inputs, links, scripts and readable text. Params: {\"url\": \"https://...\", \"selectors\": [\"form\", \"iframe\"]}"
    }

    fn parameters_schema(&self) -> Value {
        params_schema::<DomAnalyzerParams>()
    }

    async fn execute(&self, params: Value) -> Result<Value, String> {
        let params: DomAnalyzerParams = parse_params(params)?;
        tracing::info!(url = %params.url, selectors = ?params.selectors, "dom analyzer fetch");
        let page = self.fetcher.fetch(&params.url).await?;
        if !looks_like_html(&page.body) {
            return Ok(serde_json::json!({
                "success": false,
                "url": page.url,
                "status": page.status,
                "reason": "response is not HTML",
            }));
        }

        let mut analysis = analyze_markup(&page.body, &page.url, &params.selectors);
        let text: String = html_to_text(&page.body)
            .chars()
            .take(TEXT_EXCERPT_CHARS)
            .collect();
        analysis["text_excerpt"] = Value::String(text);

        let matched_any = ["forms", "inputs", "links", "scripts"]
            .iter()
            .any(|k| analysis[*k].as_array().is_some_and(|a| !a.is_empty()))
            || analysis["selector_counts"]
                .as_object()
                .is_some_and(|m| m.values().any(|v| v.as_u64().unwrap_or(0) > 0));

        let mut result = serde_json::json!({
            "success": matched_any,
            "url": page.url,
            "status": page.status,
        });
        if matched_any {
            result["found"] = analysis;
        } else {
            result["analysis"] = analysis;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"<!DOCTYPE html><html><head><title> Login </title>
        <script src="/js/app.js"></script></head><body>
        <form action="/session" method="POST"><input name="user"><input type="password" name="pw"></form>
        <a href="/help">Help</a><a href="#top">Top</a><a href="javascript:void(0)">x</a>
        <iframe src="/embed"></iframe></body></html>"##;

    #[test]
    fn test_analyze_markup() {
        let a = analyze_markup(PAGE, "https://example.com/", &["iframe".to_string()]);
        assert_eq!(a["title"], "Login");
        assert_eq!(a["forms"][0]["action"], "https://example.com/session");
        assert_eq!(a["forms"][0]["method"], "post");
        assert_eq!(a["inputs"][0]["type"], "text");
        assert_eq!(a["inputs"][1]["type"], "password");
        assert_eq!(a["links"], serde_json::json!(["https://example.com/help"]));
        assert_eq!(a["scripts"], serde_json::json!(["https://example.com/js/app.js"]));
        assert_eq!(a["selector_counts"]["iframe"], 1);
    }

    #[test]
    fn test_attr_case_insensitive() {
        assert_eq!(attr(r#"<A HREF='/x'>"#, "href").as_deref(), Some("/x"));
        assert_eq!(attr("<input>", "name"), None);
    }
}
