//! script-injector：在 Headless Chrome 载入的页面中执行脚本
//!
//! 需启用 feature "browser" 且系统已安装 Chrome/Chromium；未启用时不注册，
//! 引用它的 Action 会以 CapabilityNotFound 记录为失败 Step。
//! 注入的脚本不做沙箱隔离。

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use headless_chrome::Browser;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::schema::{params_schema, parse_params};
use crate::tools::Capability;

pub const SCRIPT_INJECTOR: &str = "script-injector";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ScriptInjectorParams {
    /// 目标页面 URL
    pub url: String,
    /// 要执行的 JavaScript 表达式；结果需可 JSON 序列化
    pub script: String,
}

/// 脚本注入能力：浏览器实例懒启动并复用
pub struct ScriptInjector {
    browser: Arc<Mutex<Option<Browser>>>,
    max_result_chars: usize,
}

impl ScriptInjector {
    pub fn new(max_result_chars: usize) -> Self {
        Self {
            browser: Arc::new(Mutex::new(None)),
            max_result_chars,
        }
    }
}

#[async_trait]
impl Capability for ScriptInjector {
    fn name(&self) -> &str {
        SCRIPT_INJECTOR
    }

    fn description(&self) -> &str {
        "Load the page in headless Chrome and evaluate a JavaScript expression in it. Params: {\"url\": \"https://...\", \"script\": \"...\"}"
    }

    fn parameters_schema(&self) -> Value {
        params_schema::<ScriptInjectorParams>()
    }

    async fn execute(&self, params: Value) -> Result<Value, String> {
        let params: ScriptInjectorParams = parse_params(params)?;
        let browser_arc = Arc::clone(&self.browser);
        let max_chars = self.max_result_chars;

        tracing::info!(url = %params.url, script_len = params.script.len(), "script injector evaluate");

        tokio::task::spawn_blocking(move || {
            let mut guard = browser_arc.lock().map_err(|e| e.to_string())?;
            if guard.is_none() {
                let browser = Browser::default()
                    .map_err(|e| format!("Chrome launch failed: {e}. Install Chrome/Chromium."))?;
                *guard = Some(browser);
            }
            let browser = guard
                .as_ref()
                .ok_or_else(|| "Browser not available".to_string())?;

            let tab = browser
                .new_tab()
                .map_err(|e| format!("Browser tab failed: {e}"))?;
            tab.navigate_to(&params.url)
                .map_err(|e| format!("Navigate failed: {e}"))?;
            tab.wait_for_element("body")
                .map_err(|e| format!("Page load failed: {e}"))?;

            let remote = tab
                .evaluate(&params.script, true)
                .map_err(|e| format!("Script evaluation failed: {e}"))?;
            let value = remote.value.unwrap_or(Value::Null);
            let _ = tab.close(true);

            let value = match value {
                Value::String(s) if s.chars().count() > max_chars => {
                    Value::String(s.chars().take(max_chars).collect::<String>() + "\n...[truncated]")
                }
                other => other,
            };
            let found = !matches!(&value, Value::Null)
                && !matches!(&value, Value::Array(a) if a.is_empty());

            Ok::<_, String>(if found {
                serde_json::json!({ "success": true, "data": value })
            } else {
                serde_json::json!({ "success": false, "value": value })
            })
        })
        .await
        .map_err(|e| format!("Task join: {e}"))?
    }
}
