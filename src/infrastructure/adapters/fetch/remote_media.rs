//! Remote Media Fetcher - 下载远程媒体引用
//!
//! 请求携带 media_url 而非文件时，由此适配器取回字节；
//! 之后的管线处理与直接上传完全一致（缓存 key 同样覆盖取回的字节）。

use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// 下载错误
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Remote server returned {0}")]
    BadStatus(String),

    #[error("Media too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },
}

/// 取回的媒体
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub bytes: Vec<u8>,
    /// 响应 Content-Type；缺失时为 application/octet-stream
    pub mime_type: String,
    /// 从 URL 路径推断的文件名
    pub file_name: String,
}

/// 下载器配置
#[derive(Debug, Clone)]
pub struct RemoteMediaFetcherConfig {
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 下载字节数上限
    pub max_bytes: usize,
}

impl Default for RemoteMediaFetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_bytes: 50 * 1024 * 1024,
        }
    }
}

/// 远程媒体下载器
pub struct RemoteMediaFetcher {
    client: Client,
    config: RemoteMediaFetcherConfig,
}

impl RemoteMediaFetcher {
    pub fn new(config: RemoteMediaFetcherConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// 下载媒体字节
    pub async fn fetch(&self, url: &str) -> Result<FetchedMedia, FetchError> {
        tracing::debug!(url = %url, "Fetching remote media");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus(status.to_string()));
        }

        let mime_type = response
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let file_name = file_name_from_url(url);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::NetworkError(e.to_string()))?
            .to_vec();

        if bytes.len() > self.config.max_bytes {
            return Err(FetchError::TooLarge {
                size: bytes.len(),
                limit: self.config.max_bytes,
            });
        }

        tracing::info!(
            url = %url,
            size = bytes.len(),
            mime_type = %mime_type,
            "Remote media fetched"
        );

        Ok(FetchedMedia {
            bytes,
            mime_type,
            file_name,
        })
    }
}

/// URL 路径最后一段作为文件名
fn file_name_from_url(url: &str) -> String {
    url.split('?')
        .next()
        .unwrap_or(url)
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .unwrap_or("remote-media")
        .to_string()
}
