//! Text Generation Port - 文本生成引擎抽象
//!
//! 摘要、排版、翻译共用同一个生成接口：`generate(prompt) -> text`。
//! 除纯文本外没有结构化输出契约。

use async_trait::async_trait;
use thiserror::Error;

/// 生成服务错误
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Text Generation Port
///
/// 外部文本生成服务的抽象接口
#[async_trait]
pub trait TextGenerationPort: Send + Sync {
    /// 针对单个提示词生成文本
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// 检查生成服务是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}
