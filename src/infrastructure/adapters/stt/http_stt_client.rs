//! HTTP STT Client - 调用外部语音转写 HTTP 服务
//!
//! 实现 SpeechToTextPort trait，通过 HTTP 调用外部 STT 服务
//!
//! 外部 STT API:
//! POST http://localhost:8100/api/stt/transcribe
//! Request: multipart (file + language)
//! Response: JSON {"text": "..."}

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::application::ports::{SpeechToTextPort, SttError, TranscribeRequest};

/// 转写响应体 (JSON)
#[derive(Debug, Deserialize)]
struct SttHttpResponse {
    text: String,
}

/// HTTP STT 客户端配置
#[derive(Debug, Clone)]
pub struct HttpSttClientConfig {
    /// STT 服务基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 传输级失败的最大重试次数
    pub max_retries: u32,
}

impl Default for HttpSttClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8100".to_string(),
            timeout_secs: 300,
            max_retries: 0,
        }
    }
}

/// HTTP STT 客户端
pub struct HttpSttClient {
    client: Client,
    config: HttpSttClientConfig,
}

impl HttpSttClient {
    /// 创建新的 HTTP STT 客户端
    pub fn new(config: HttpSttClientConfig) -> Result<Self, SttError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SttError::UpstreamError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn transcribe_url(&self) -> String {
        format!("{}/api/stt/transcribe", self.config.base_url)
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.config.base_url)
    }

    async fn try_transcribe(&self, request: &TranscribeRequest) -> Result<String, SttError> {
        let part = Part::bytes(request.media.clone())
            .file_name(request.file_name.clone())
            .mime_str(&request.mime_type)
            .map_err(|e| SttError::ServiceError(format!("Invalid mime type: {e}")))?;
        let form = Form::new()
            .part("file", part)
            .text("language", request.language_hint.clone());

        tracing::debug!(
            url = %self.transcribe_url(),
            media_size = request.media.len(),
            mime_type = %request.mime_type,
            language = %request.language_hint,
            "Sending transcription request"
        );

        let response = self
            .client
            .post(self.transcribe_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SttError::Timeout
                } else if e.is_connect() {
                    SttError::UpstreamError(format!("Cannot connect to STT service: {e}"))
                } else {
                    SttError::UpstreamError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            // 4xx 是服务端对输入的拒绝，5xx 才是上游故障
            return if status.is_client_error() {
                Err(SttError::ServiceError(format!("HTTP {status}: {error_text}")))
            } else {
                Err(SttError::UpstreamError(format!("HTTP {status}: {error_text}")))
            };
        }

        let body: SttHttpResponse = response
            .json()
            .await
            .map_err(|e| SttError::UpstreamError(format!("Failed to decode response: {e}")))?;

        tracing::info!(
            transcript_len = body.text.len(),
            "Transcription completed"
        );

        Ok(body.text)
    }
}

/// 传输级失败可以安全重发（转写调用幂等）
fn is_retryable(err: &SttError) -> bool {
    matches!(err, SttError::Timeout | SttError::UpstreamError(_))
}

#[async_trait]
impl SpeechToTextPort for HttpSttClient {
    async fn transcribe(&self, request: TranscribeRequest) -> Result<String, SttError> {
        let mut attempt = 0u32;
        loop {
            match self.try_transcribe(&request).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.config.max_retries && is_retryable(&e) => {
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        max_retries = self.config.max_retries,
                        error = %e,
                        "Transcription attempt failed, retrying"
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
