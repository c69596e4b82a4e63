//! Speech-to-Text Port - 语音转写引擎抽象
//!
//! 定义语音转写的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;

/// STT 错误
#[derive(Debug, Error)]
pub enum SttError {
    /// 服务端拒绝：不支持的格式、超出大小限制等
    #[error("Service error: {0}")]
    ServiceError(String),

    /// 传输或配额失败
    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Request timeout")]
    Timeout,
}

/// 转写请求
#[derive(Debug, Clone)]
pub struct TranscribeRequest {
    /// 媒体文件原始字节
    pub media: Vec<u8>,
    /// MIME 类型（audio/* 或 video/*）
    pub mime_type: String,
    /// 原始文件名（用于日志和上游表单）
    pub file_name: String,
    /// 媒体语言提示
    pub language_hint: String,
}

/// Speech-to-Text Port
///
/// 外部语音转写服务的抽象接口
#[async_trait]
pub trait SpeechToTextPort: Send + Sync {
    /// 将媒体字节转写为纯文本
    async fn transcribe(&self, request: TranscribeRequest) -> Result<String, SttError>;

    /// 检查转写服务是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}
