//! Fake STT Client - 本地开发用转写客户端
//!
//! 始终返回固定转写文本，不实际调用 STT 服务

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::application::ports::{SpeechToTextPort, SttError, TranscribeRequest};

/// Fake STT Client 配置
#[derive(Debug, Clone)]
pub struct FakeSttClientConfig {
    /// 固定返回的转写文本
    pub transcript: String,
    /// 模拟转写延迟（毫秒）
    pub delay_ms: u64,
}

impl Default for FakeSttClientConfig {
    fn default() -> Self {
        Self {
            transcript: "This is a fixed transcript used for local development. \
                         It has several sentences. Enough to produce more than one chunk."
                .to_string(),
            delay_ms: 50,
        }
    }
}

/// Fake STT Client
pub struct FakeSttClient {
    config: FakeSttClientConfig,
    calls: AtomicU64,
}

impl FakeSttClient {
    pub fn new(config: FakeSttClientConfig) -> Self {
        Self {
            config,
            calls: AtomicU64::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(FakeSttClientConfig::default())
    }

    /// 已发生的转写调用次数
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechToTextPort for FakeSttClient {
    async fn transcribe(&self, request: TranscribeRequest) -> Result<String, SttError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            media_size = request.media.len(),
            mime_type = %request.mime_type,
            "FakeSttClient: returning fixed transcript"
        );

        tokio::time::sleep(std::time::Duration::from_millis(self.config.delay_ms)).await;
        Ok(self.config.transcript.clone())
    }
}
