//! 推理 Oracle：后端抽象、OpenAI 兼容 / DeepSeek / 离线启发式 / Mock 后端，以及统一的适配层

pub mod adapter;
pub mod confidence;
pub mod deepseek;
pub mod mock;
pub mod offline;
pub mod openai;
pub mod traits;

pub use adapter::{OracleAdapter, OracleCredentials, OracleVerdict};
pub use confidence::{extract_confidence, DEFAULT_CONFIDENCE};
pub use deepseek::{create_deepseek_backend, DEEPSEEK_BASE_URL, DEEPSEEK_CHAT, DEEPSEEK_REASONER};
pub use mock::MockBackend;
pub use offline::OfflineHeuristic;
pub use openai::{OpenAiBackend, OPENAI_DEFAULT_MODEL};
pub use traits::{Message, OracleBackend, Role};
