//! 页面抓取：内置能力共用的 HTTP 客户端
//!
//! GET 请求带超时与 User-Agent；响应体超过 max_body_chars 时截断。
//! 对 HTML 响应可用 html2text 提取可读文本。

use std::sync::OnceLock;
use std::time::Duration;

use html2text::from_read;
use regex::Regex;
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::Client;

/// 抓取结果
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// 重定向后的最终 URL
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub truncated: bool,
}

/// 共享抓取器：Clone 成本低（reqwest::Client 内部为 Arc）
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    max_body_chars: usize,
}

impl PageFetcher {
    pub fn new(timeout_secs: u64, user_agent: &str, max_body_chars: usize) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(v) = "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8".parse() {
            headers.insert(ACCEPT, v);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .default_headers(headers)
            .build()
            .unwrap_or_default();
        Self {
            client,
            max_body_chars,
        }
    }

    /// GET url；非 http(s) 或请求失败返回 Err，非 2xx 仍返回页面（status 交给调用方判断）
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, String> {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!("Unsupported URL: {url}"));
        }
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("Request failed: {e}"))?;
        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let headers = resp
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();
        let mut body = resp
            .text()
            .await
            .map_err(|e| format!("Read body: {e}"))?;

        // 去除 BOM
        if body.starts_with('\u{FEFF}') {
            body = body.trim_start_matches('\u{FEFF}').to_string();
        }

        let truncated = body.chars().count() > self.max_body_chars;
        if truncated {
            body = body.chars().take(self.max_body_chars).collect();
        }

        Ok(FetchedPage {
            url: final_url,
            status,
            headers,
            body,
            truncated,
        })
    }
}

/// 页面中 `<script src=...>` 引用的脚本（解析为绝对 URL，按出现顺序去重）
pub fn script_sources(html: &str, base: &str) -> Vec<String> {
    static SCRIPT_SRC_RE: OnceLock<Regex> = OnceLock::new();
    let re = SCRIPT_SRC_RE.get_or_init(|| {
        Regex::new(r#"(?i)<script\b[^>]*\bsrc\s*=\s*["']([^"']+)["']"#).unwrap()
    });
    let mut out: Vec<String> = Vec::new();
    for cap in re.captures_iter(html) {
        let url = resolve_url(base, &cap[1]);
        if !out.contains(&url) {
            out.push(url);
        }
    }
    out
}

/// 抓取页面本身及最多 max_scripts 个同源外链脚本，返回 (来源 URL, 内容)；脚本抓取失败只记日志
pub async fn collect_sources(
    fetcher: &PageFetcher,
    page: &FetchedPage,
    max_scripts: usize,
) -> Vec<(String, String)> {
    let mut sources = vec![(page.url.clone(), page.body.clone())];
    let scripts = script_sources(&page.body, &page.url)
        .into_iter()
        .filter(|s| same_origin(s, &page.url))
        .take(max_scripts);
    for script in scripts {
        match fetcher.fetch(&script).await {
            Ok(p) if (200..300).contains(&p.status) => sources.push((p.url, p.body)),
            Ok(p) => tracing::debug!(url = %script, status = p.status, "script fetch skipped"),
            Err(e) => tracing::debug!(url = %script, error = %e, "script fetch failed"),
        }
    }
    sources
}

/// 判断内容是否像 HTML
pub fn looks_like_html(s: &str) -> bool {
    let s = s.trim_start();
    s.starts_with("<!") || s.starts_with("<html") || s.starts_with("<HTML")
        || (s.len() > 20 && s.contains('<') && (s.contains("</") || s.contains("<head") || s.contains("<title")))
}

/// HTML 转可读文本；失败时回退到简易去标签
pub fn html_to_text(html: &str) -> String {
    match from_read(html.as_bytes(), 120) {
        Ok(text) if !text.trim().is_empty() => text,
        _ => strip_html_tags(html),
    }
}

fn strip_html_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 将相对路径解析为基于 base 的绝对 URL；无法解析时原样返回
pub fn resolve_url(base: &str, href: &str) -> String {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    match reqwest::Url::parse(base).and_then(|b| b.join(href)) {
        Ok(u) => u.to_string(),
        Err(_) => href.to_string(),
    }
}

/// 两个 URL 是否同源（scheme + host + port）
pub fn same_origin(a: &str, b: &str) -> bool {
    match (reqwest::Url::parse(a), reqwest::Url::parse(b)) {
        (Ok(a), Ok(b)) => {
            a.scheme() == b.scheme()
                && a.host_str() == b.host_str()
                && a.port_or_known_default() == b.port_or_known_default()
        }
        _ => false,
    }
}
