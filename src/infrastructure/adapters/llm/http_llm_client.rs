//! HTTP LLM Client - 调用外部文本生成 HTTP 服务
//!
//! 实现 TextGenerationPort trait
//!
//! 外部生成 API:
//! POST http://localhost:8200/v1/generate
//! Request: {"model": "...", "prompt": "..."}  (JSON)
//! Response: {"text": "..."}

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::{GenerationError, TextGenerationPort};

/// 生成请求体 (JSON)
#[derive(Debug, Serialize)]
struct GenerateHttpRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// 生成响应体 (JSON)
#[derive(Debug, Deserialize)]
struct GenerateHttpResponse {
    text: String,
}

/// HTTP LLM 客户端配置
#[derive(Debug, Clone)]
pub struct HttpLlmClientConfig {
    /// 生成服务基础 URL
    pub base_url: String,
    /// 模型名
    pub model: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 传输级失败的最大重试次数
    pub max_retries: u32,
}

impl Default for HttpLlmClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8200".to_string(),
            model: "default".to_string(),
            timeout_secs: 120,
            max_retries: 0,
        }
    }
}

/// HTTP LLM 客户端
pub struct HttpLlmClient {
    client: Client,
    config: HttpLlmClientConfig,
}

impl HttpLlmClient {
    /// 创建新的 HTTP LLM 客户端
    pub fn new(config: HttpLlmClientConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::UpstreamError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn generate_url(&self) -> String {
        format!("{}/v1/generate", self.config.base_url)
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.config.base_url)
    }

    async fn try_generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = GenerateHttpRequest {
            model: &self.config.model,
            prompt,
        };

        tracing::debug!(
            url = %self.generate_url(),
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Sending generation request"
        );

        let response = self
            .client
            .post(self.generate_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout
                } else if e.is_connect() {
                    GenerationError::UpstreamError(format!(
                        "Cannot connect to generation service: {e}"
                    ))
                } else {
                    GenerationError::UpstreamError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::UpstreamError(format!(
                "HTTP {status}: {error_text}"
            )));
        }

        let body: GenerateHttpResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        Ok(body.text)
    }
}

/// 同一 prompt 重发安全（生成调用无副作用）
fn is_retryable(err: &GenerationError) -> bool {
    matches!(
        err,
        GenerationError::Timeout | GenerationError::UpstreamError(_)
    )
}

#[async_trait]
impl TextGenerationPort for HttpLlmClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut attempt = 0u32;
        loop {
            match self.try_generate(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.config.max_retries && is_retryable(&e) => {
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        max_retries = self.config.max_retries,
                        error = %e,
                        "Generation attempt failed, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn health_check(&self) -> bool {
        matches!(
            self.client
                .get(self.health_url())
                .timeout(Duration::from_secs(5))
                .send()
                .await,
            Ok(response) if response.status().is_success()
        )
    }
}
