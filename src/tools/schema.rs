//! 能力参数 JSON Schema 生成（schemars 自动生成）
//!
//! 内置能力以参数结构体派生 JsonSchema，parameters_schema() 直接返回生成结果。

use schemars::{schema_for, JsonSchema};
use serde_json::Value;

/// 返回参数结构体的 JSON Schema
pub fn params_schema<T: JsonSchema>() -> Value {
    let schema = schema_for!(T);
    serde_json::to_value(&schema).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

/// 从参数 JSON 反序列化参数结构体，错误转为能力层的字符串错误
pub fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, String> {
    serde_json::from_value(params).map_err(|e| format!("Invalid parameters: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[allow(dead_code)]
    #[derive(Debug, Deserialize, JsonSchema)]
    struct FetchParams {
        /// 目标 URL
        url: String,
        limit: Option<usize>,
    }

    #[test]
    fn test_schema_has_properties() {
        let schema = params_schema::<FetchParams>();
        assert!(schema["properties"]["url"].is_object());
        assert_eq!(schema["required"], serde_json::json!(["url"]));
    }

    #[test]
    fn test_parse_params_error() {
        let err = parse_params::<FetchParams>(serde_json::json!({"limit": 3})).unwrap_err();
        assert!(err.starts_with("Invalid parameters"));
    }
}
