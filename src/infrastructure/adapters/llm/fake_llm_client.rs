//! Fake LLM Client - 本地开发用生成客户端
//!
//! 根据 prompt 首行回显固定格式文本，不实际调用生成服务

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::application::ports::{GenerationError, TextGenerationPort};

/// Fake LLM Client 配置
#[derive(Debug, Clone)]
pub struct FakeLlmClientConfig {
    /// 模拟生成延迟（毫秒）
    pub delay_ms: u64,
}

impl Default for FakeLlmClientConfig {
    fn default() -> Self {
        Self { delay_ms: 100 }
    }
}

/// Fake LLM Client
pub struct FakeLlmClient {
    config: FakeLlmClientConfig,
    calls: AtomicU64,
}

impl FakeLlmClient {
    pub fn new(config: FakeLlmClientConfig) -> Self {
        Self {
            config,
            calls: AtomicU64::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(FakeLlmClientConfig::default())
    }

    /// 已发生的生成调用次数
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerationPort for FakeLlmClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(std::time::Duration::from_millis(self.config.delay_ms)).await;

        let head: String = prompt.lines().next().unwrap_or("").chars().take(64).collect();
        Ok(format!("[fake generation] {head}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echoes_prompt_head_and_counts_calls() {
        let client = FakeLlmClient::new(FakeLlmClientConfig { delay_ms: 0 });

        let out = client.generate("First line\nsecond line").await.unwrap();

        assert_eq!(out, "[fake generation] First line");
        assert_eq!(client.calls(), 1);
    }
}
