//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `FORAGER__*` 覆盖（双下划线表示嵌套，如 `FORAGER__ORACLE__BACKEND=offline`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub oracle: OracleSection,
    pub orchestrator: OrchestratorSection,
    pub capabilities: CapabilitiesSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [oracle] 段：后端选择、模型、超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OracleSection {
    /// 后端：auto / openai / deepseek / offline；auto 按可用 API Key 选择，无 Key 时走离线启发式
    pub backend: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// 未设置时读取 OPENAI_API_KEY / DEEPSEEK_API_KEY
    pub api_key: Option<String>,
    /// 单次推理超时（秒）
    pub timeout_secs: u64,
}

impl Default for OracleSection {
    fn default() -> Self {
        Self {
            backend: "auto".to_string(),
            model: None,
            base_url: None,
            api_key: None,
            timeout_secs: 60,
        }
    }
}

/// [orchestrator] 段：attempt 预算、策略标签、验证窗口
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorSection {
    pub attempt_budget: usize,
    pub strategies: Vec<String>,
    /// 失败后是否向 Oracle 请求下一次 attempt 的策略名
    pub suggest_strategies: bool,
    /// 验证 prompt 中汇总的最近 Step 数（上限 3）
    pub verification_window: usize,
}

pub fn default_strategies() -> Vec<String> {
    vec![
        "primary".into(),
        "alternative-1".into(),
        "alternative-2".into(),
        "brute-force".into(),
        "deep-analysis".into(),
    ]
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            attempt_budget: 5,
            strategies: default_strategies(),
            suggest_strategies: true,
            verification_window: 3,
        }
    }
}

/// [capabilities] 段：内置能力的超时与抓取限制
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CapabilitiesSection {
    /// 单次能力调用超时（秒）
    pub timeout_secs: u64,
    /// HTTP 抓取超时（秒）
    pub http_timeout_secs: u64,
    pub max_body_chars: usize,
    pub user_agent: String,
}

impl Default for CapabilitiesSection {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            http_timeout_secs: 15,
            max_body_chars: 200_000,
            user_agent: concat!("forager/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 FORAGER__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 FORAGER__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("FORAGER")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.oracle.backend, "auto");
        assert_eq!(cfg.oracle.timeout_secs, 60);
        assert_eq!(cfg.orchestrator.attempt_budget, 5);
        assert_eq!(cfg.orchestrator.strategies.len(), 5);
        assert_eq!(cfg.orchestrator.strategies[0], "primary");
        assert!(cfg.orchestrator.suggest_strategies);
        assert_eq!(cfg.capabilities.timeout_secs, 30);
    }

    #[test]
    fn test_load_from_file_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[oracle]\nbackend = \"offline\"\n\n[orchestrator]\nattempt_budget = 2\nstrategies = [\"only\"]\n"
        )
        .unwrap();
        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.oracle.backend, "offline");
        assert_eq!(cfg.orchestrator.attempt_budget, 2);
        assert_eq!(cfg.orchestrator.strategies, vec!["only".to_string()]);
        // 未写的键保持默认
        assert_eq!(cfg.orchestrator.verification_window, 3);
        assert_eq!(cfg.capabilities.http_timeout_secs, 15);
    }
}
