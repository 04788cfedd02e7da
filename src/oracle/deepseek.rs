//! DeepSeek 推理后端（OpenAI 兼容格式）
//!
//! - Base URL: https://api.deepseek.com
//! - 模型: deepseek-chat (常规对话), deepseek-reasoner (思考模式)

use crate::oracle::OpenAiBackend;

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";
pub const DEEPSEEK_REASONER: &str = "deepseek-reasoner";

/// 创建 DeepSeek 后端；base_url 未给出时使用官方端点
pub fn create_deepseek_backend(api_key: &str, model: Option<&str>, base_url: Option<&str>) -> OpenAiBackend {
    let model = model.unwrap_or(DEEPSEEK_CHAT);
    OpenAiBackend::new(Some(base_url.unwrap_or(DEEPSEEK_BASE_URL)), model, api_key)
        .with_label(format!("deepseek:{model}"))
}
