//! secret-scanner：在页面与同源脚本中匹配密钥/令牌模式
//!
//! 结果中的值只保留前 4 个字符，其余以 * 遮盖。

use std::collections::HashSet;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::http::{collect_sources, PageFetcher};
use crate::tools::schema::{params_schema, parse_params};
use crate::tools::Capability;

pub const SECRET_SCANNER: &str = "secret-scanner";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SecretScannerParams {
    /// 目标页面 URL
    pub url: String,
    /// 仅启用这些模式（如 aws-access-key、jwt）；为空时全部启用
    #[serde(default)]
    pub patterns: Vec<String>,
    /// 最多抓取的同源外链脚本数
    #[serde(default = "default_max_scripts")]
    pub max_scripts: usize,
}

fn default_max_scripts() -> usize {
    10
}

/// 一条匹配
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretMatch {
    pub kind: String,
    pub masked: String,
    pub source: String,
}

struct SecretPattern {
    kind: &'static str,
    re: Regex,
    /// 值所在的捕获组（0 表示整段匹配）
    group: usize,
}

fn patterns() -> &'static [SecretPattern] {
    static PATTERNS: OnceLock<Vec<SecretPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let table: [(&'static str, &str, usize); 7] = [
            ("aws-access-key", r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b", 0),
            ("google-api-key", r"\bAIza[0-9A-Za-z_\-]{35}", 0),
            ("slack-token", r"\bxox[abprs]-[0-9A-Za-z\-]{10,72}", 0),
            ("github-token", r"\bgh[pousr]_[0-9A-Za-z]{36}\b", 0),
            ("stripe-key", r"\b(?:sk|pk|rk)_(?:live|test)_[0-9A-Za-z]{16,}", 0),
            (
                "jwt",
                r"\beyJ[A-Za-z0-9_\-]{10,}\.[A-Za-z0-9_\-]{10,}\.[A-Za-z0-9_\-]{10,}",
                0,
            ),
            (
                "generic-secret",
                r#"(?i)\b(?:api[_\-]?key|apikey|secret|client[_\-]?secret|access[_\-]?token|auth[_\-]?token)["']?\s*[:=]\s*["']([A-Za-z0-9_\-\.]{12,})["']"#,
                1,
            ),
        ];
        table
            .into_iter()
            .filter_map(|(kind, pattern, group)| {
                Regex::new(pattern)
                    .map(|re| SecretPattern { kind, re, group })
                    .ok()
            })
            .collect()
    })
}

/// 遮盖值：保留前 4 个字符
pub fn mask(value: &str) -> String {
    let visible: String = value.chars().take(4).collect();
    let hidden = value.chars().count().saturating_sub(4).min(32);
    format!("{visible}{}", "*".repeat(hidden))
}

/// 在一段内容中扫描；enabled 为空表示启用全部模式
pub fn scan_source(content: &str, source: &str, enabled: &[String]) -> Vec<SecretMatch> {
    let mut out = Vec::new();
    for p in patterns() {
        if !enabled.is_empty() && !enabled.iter().any(|e| e == p.kind) {
            continue;
        }
        for cap in p.re.captures_iter(content) {
            if let Some(m) = cap.get(p.group) {
                out.push(SecretMatch {
                    kind: p.kind.to_string(),
                    masked: mask(m.as_str()),
                    source: source.to_string(),
                });
            }
        }
    }
    out
}

/// 密钥扫描能力
pub struct SecretScanner {
    fetcher: PageFetcher,
}

impl SecretScanner {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Capability for SecretScanner {
    fn name(&self) -> &str {
        SECRET_SCANNER
    }

    fn description(&self) -> &str {
        "Scan a page and its same-origin scripts for exposed API keys, tokens and credentials. Params: {\"url\": \"https://...\", \"patterns\": [\"jwt\"]}"
    }

    fn parameters_schema(&self) -> Value {
        params_schema::<SecretScannerParams>()
    }

    async fn execute(&self, params: Value) -> Result<Value, String> {
        let params: SecretScannerParams = parse_params(params)?;
        tracing::info!(url = %params.url, "secret scanner fetch");
        let page = self.fetcher.fetch(&params.url).await?;
        let sources = collect_sources(&self.fetcher, &page, params.max_scripts).await;

        let mut seen = HashSet::new();
        let matches: Vec<SecretMatch> = sources
            .iter()
            .flat_map(|(src, content)| scan_source(content, src, &params.patterns))
            .filter(|m| seen.insert((m.kind.clone(), m.masked.clone())))
            .collect();

        let mut result = serde_json::json!({
            "success": !matches.is_empty(),
            "url": page.url,
            "sources_scanned": sources.len(),
        });
        if !matches.is_empty() {
            result["found"] = serde_json::to_value(&matches).map_err(|e| e.to_string())?;
        }
        Ok(result)
    }
}
