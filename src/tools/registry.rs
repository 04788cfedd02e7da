//! 能力注册表
//!
//! 所有能力实现 Capability trait（name / description / execute），由 CapabilityRegistry 按名注册与查找；
//! 同名注册后写覆盖。注册表在运行期间只读，可通过 Arc 在多个并发 Run 间共享。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::ForagerError;

/// 能力 trait：名称、描述（供 Oracle 理解）、参数 schema、异步执行（params 为 JSON）
#[async_trait]
pub trait Capability: Send + Sync {
    /// 能力名称（Action.capability 引用的唯一键）
    fn name(&self) -> &str;

    /// 能力描述
    fn description(&self) -> &str;

    /// 参数 JSON Schema；默认不限
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// 执行能力；返回结果对编排器不透明（仅检查 success / data / found）
    async fn execute(&self, params: Value) -> Result<Value, String>;
}

/// 能力注册表：按名称存储 Arc<dyn Capability>
#[derive(Default, Clone)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册能力；同名时覆盖旧实现
    pub fn register(&mut self, capability: impl Capability + 'static) {
        self.register_arc(Arc::new(capability));
    }

    pub fn register_arc(&mut self, capability: Arc<dyn Capability>) {
        let name = capability.name().to_string();
        if self.capabilities.insert(name.clone(), capability).is_some() {
            tracing::debug!(capability = %name, "capability replaced");
        }
    }

    /// 按名查找；不存在返回 CapabilityNotFound
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Capability>, ForagerError> {
        self.capabilities
            .get(name)
            .cloned()
            .ok_or_else(|| ForagerError::CapabilityNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    /// 已注册能力名（排序后返回，便于稳定输出）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.capabilities.keys().cloned().collect();
        names.sort();
        names
    }

    /// 返回 (name, description) 列表，用于 prompt 中的 Available capabilities 段落
    pub fn descriptions(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .capabilities
            .iter()
            .map(|(name, c)| (name.clone(), c.description().to_string()))
            .collect();
        out.sort();
        out
    }

    /// 能力目录 JSON（含参数 schema）
    pub fn to_schema_json(&self) -> String {
        let mut entries: Vec<(&String, &Arc<dyn Capability>)> = self.capabilities.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        let list: Vec<Value> = entries
            .into_iter()
            .map(|(name, c)| {
                serde_json::json!({
                    "name": name,
                    "description": c.description(),
                    "parameters": c.parameters_schema()
                })
            })
            .collect();
        serde_json::to_string_pretty(&list).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

impl FromIterator<Arc<dyn Capability>> for CapabilityRegistry {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Capability>>>(iter: I) -> Self {
        let mut registry = CapabilityRegistry::new();
        for c in iter {
            registry.register_arc(c);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        name: &'static str,
        value: Value,
    }

    #[async_trait]
    impl Capability for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "fixed"
        }

        async fn execute(&self, _params: Value) -> Result<Value, String> {
            Ok(self.value.clone())
        }
    }

    #[tokio::test]
    async fn test_register_replaces_by_name() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Fixed { name: "dom-analyzer", value: serde_json::json!(1) });
        registry.register(Fixed { name: "dom-analyzer", value: serde_json::json!(2) });
        assert_eq!(registry.len(), 1);
        let cap = registry.resolve("dom-analyzer").unwrap();
        assert_eq!(cap.execute(Value::Null).await.unwrap(), serde_json::json!(2));
    }

    #[test]
    fn test_resolve_missing() {
        let registry = CapabilityRegistry::new();
        match registry.resolve("network-monitor") {
            Err(ForagerError::CapabilityNotFound(name)) => assert_eq!(name, "network-monitor"),
            _ => panic!("Expected CapabilityNotFound"),
        }
    }

    #[test]
    fn test_schema_json_lists_sorted() {
        let registry: CapabilityRegistry = vec![
            Arc::new(Fixed { name: "b", value: Value::Null }) as Arc<dyn Capability>,
            Arc::new(Fixed { name: "a", value: Value::Null }) as Arc<dyn Capability>,
        ]
        .into_iter()
        .collect();
        assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);
        let json: Vec<Value> = serde_json::from_str(&registry.to_schema_json()).unwrap();
        assert_eq!(json[0]["name"], "a");
    }
}
