//! 能力层：Capability trait、注册表、Action 分发器与内置能力
//!
//! 内置能力均基于 HTTP 抓取；script-injector 需要 feature "browser"。

pub mod dom_analyzer;
pub mod endpoint_scraper;
pub mod executor;
pub mod http;
pub mod network_monitor;
pub mod registry;
pub mod schema;
pub mod secret_scanner;

#[cfg(feature = "browser")]
pub mod script_injector;

pub use dom_analyzer::{DomAnalyzer, DOM_ANALYZER};
pub use endpoint_scraper::{EndpointScraper, ENDPOINT_SCRAPER};
pub use executor::ActionDispatcher;
pub use http::PageFetcher;
pub use network_monitor::{NetworkMonitor, NETWORK_MONITOR};
pub use registry::{Capability, CapabilityRegistry};
pub use secret_scanner::{SecretScanner, SECRET_SCANNER};

#[cfg(feature = "browser")]
pub use script_injector::{ScriptInjector, SCRIPT_INJECTOR};

/// script-injector 的能力名（无 browser feature 时也用于生成 Action）
#[cfg(not(feature = "browser"))]
pub const SCRIPT_INJECTOR: &str = "script-injector";

use crate::config::CapabilitiesSection;

/// 构建内置能力注册表（CLI 默认使用；宿主也可自行注册）
pub fn builtin_registry(cfg: &CapabilitiesSection) -> CapabilityRegistry {
    let fetcher = PageFetcher::new(cfg.http_timeout_secs, &cfg.user_agent, cfg.max_body_chars);

    let mut registry = CapabilityRegistry::new();
    registry.register(NetworkMonitor::new(fetcher.clone()));
    registry.register(DomAnalyzer::new(fetcher.clone()));
    registry.register(SecretScanner::new(fetcher.clone()));
    registry.register(EndpointScraper::new(fetcher));

    #[cfg(feature = "browser")]
    registry.register(ScriptInjector::new(cfg.max_body_chars));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_names() {
        let registry = builtin_registry(&CapabilitiesSection::default());
        assert!(registry.contains(NETWORK_MONITOR));
        assert!(registry.contains(DOM_ANALYZER));
        assert!(registry.contains(SECRET_SCANNER));
        assert!(registry.contains(ENDPOINT_SCRAPER));
        assert_eq!(registry.contains(SCRIPT_INJECTOR), cfg!(feature = "browser"));
    }
}
