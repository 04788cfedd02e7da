//! network-monitor：被动网络捕获
//!
//! 无浏览器时以 HTTP 抓取近似：记录目标响应（状态、头、最终 URL），
//! 并收集页面与同源脚本中引用的、看起来像 API 调用的请求地址。

use std::collections::BTreeSet;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::endpoint_scraper::{is_api_like, scrape_endpoints};
use crate::tools::http::{collect_sources, resolve_url, PageFetcher};
use crate::tools::schema::{params_schema, parse_params};
use crate::tools::Capability;

pub const NETWORK_MONITOR: &str = "network-monitor";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NetworkMonitorParams {
    /// 目标页面 URL
    pub url: String,
    /// 是否在结果中附带响应头
    #[serde(default = "default_true")]
    pub include_headers: bool,
    /// 仅保留包含该子串的请求
    #[serde(default)]
    pub filter: Option<String>,
}

fn default_true() -> bool {
    true
}

fn reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\b(?:href|src|action|data-url|data-endpoint)\s*=\s*["']([^"'#]+)["']"#).unwrap()
    })
}

/// 网络捕获能力
pub struct NetworkMonitor {
    fetcher: PageFetcher,
}

impl NetworkMonitor {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Capability for NetworkMonitor {
    fn name(&self) -> &str {
        NETWORK_MONITOR
    }

    fn description(&self) -> &str {
        "Capture the target's HTTP response and the API requests its page and scripts reference. Params: {\"url\": \"https://...\", \"filter\": \"optional substring\"}"
    }

    fn parameters_schema(&self) -> Value {
        params_schema::<NetworkMonitorParams>()
    }

    async fn execute(&self, params: Value) -> Result<Value, String> {
        let params: NetworkMonitorParams = parse_params(params)?;
        tracing::info!(url = %params.url, "network monitor capture");
        let page = self.fetcher.fetch(&params.url).await?;
        let sources = collect_sources(&self.fetcher, &page, 10).await;

        let mut requests = BTreeSet::new();
        for (_, content) in &sources {
            for cap in reference_re().captures_iter(content) {
                let url = resolve_url(&page.url, &cap[1]);
                if is_api_like(&url) {
                    requests.insert(url);
                }
            }
            requests.extend(scrape_endpoints(content, &page.url));
        }
        if let Some(filter) = params.filter.as_deref().filter(|f| !f.is_empty()) {
            requests.retain(|r| r.contains(filter));
        }

        let captured_any = !requests.is_empty();
        let mut capture = serde_json::json!({
            "url": page.url,
            "status": page.status,
            "requests": requests,
            "truncated": page.truncated,
        });
        if params.include_headers {
            let headers: serde_json::Map<String, Value> = page
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            capture["headers"] = Value::Object(headers);
        }

        if !captured_any {
            capture["success"] = Value::Bool(false);
            Ok(capture)
        } else {
            Ok(serde_json::json!({ "success": true, "data": capture }))
        }
    }
}
