//! endpoint-scraper：从页面与同源脚本中抓取疑似 API 端点
//!
//! 匹配 fetch / axios / XMLHttpRequest.open 的字面量参数，以及以 /api、/vN、/graphql、/rest 开头的引号路径。

use std::collections::BTreeSet;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::http::{collect_sources, resolve_url, PageFetcher};
use crate::tools::schema::{params_schema, parse_params};
use crate::tools::Capability;

pub const ENDPOINT_SCRAPER: &str = "endpoint-scraper";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EndpointScraperParams {
    /// 目标页面 URL
    pub url: String,
    /// 最多抓取的同源外链脚本数
    #[serde(default = "default_max_scripts")]
    pub max_scripts: usize,
}

fn default_max_scripts() -> usize {
    10
}

fn call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?:fetch|axios(?:\.(?:get|post|put|patch|delete))?|\.open)\(\s*(?:["'][A-Z]+["']\s*,\s*)?["'`]([^"'`\s]+)["'`]"#)
            .unwrap()
    })
}

fn quoted_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"["'`](/(?:api|v\d+|graphql|rest)\b[^"'`\s]*|https?://[^"'`\s]+/(?:api|v\d+|graphql|rest)\b[^"'`\s]*)["'`]"#)
            .unwrap()
    })
}

fn versioned_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/v\d+(?:/|$)").unwrap())
}

/// URL/路径是否像 API 调用
pub fn is_api_like(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.contains("/api")
        || lower.contains("graphql")
        || lower.contains("/rest/")
        || lower.ends_with(".json")
        || versioned_re().is_match(&lower)
}

/// 从一段源码中提取端点（已解析为绝对 URL）
pub fn scrape_endpoints(source: &str, base: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for cap in call_re().captures_iter(source) {
        out.insert(resolve_url(base, &cap[1]));
    }
    for cap in quoted_path_re().captures_iter(source) {
        out.insert(resolve_url(base, &cap[1]));
    }
    out
}

/// 端点抓取能力
pub struct EndpointScraper {
    fetcher: PageFetcher,
}

impl EndpointScraper {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Capability for EndpointScraper {
    fn name(&self) -> &str {
        ENDPOINT_SCRAPER
    }

    fn description(&self) -> &str {
        "Scrape API endpoint patterns from a page and its same-origin scripts. Params: {\"url\": \"https://...\"}"
    }

    fn parameters_schema(&self) -> Value {
        params_schema::<EndpointScraperParams>()
    }

    async fn execute(&self, params: Value) -> Result<Value, String> {
        let params: EndpointScraperParams = parse_params(params)?;
        tracing::info!(url = %params.url, "endpoint scraper fetch");
        let page = self.fetcher.fetch(&params.url).await?;
        let sources = collect_sources(&self.fetcher, &page, params.max_scripts).await;

        let mut endpoints = BTreeSet::new();
        for (_, content) in &sources {
            endpoints.extend(scrape_endpoints(content, &page.url));
        }

        let mut result = serde_json::json!({
            "success": !endpoints.is_empty(),
            "url": page.url,
            "status": page.status,
            "sources_scanned": sources.len(),
        });
        if !endpoints.is_empty() {
            result["found"] = serde_json::json!(endpoints);
        }
        Ok(result)
    }
}
