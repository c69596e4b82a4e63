//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// STT 服务配置
    #[serde(default)]
    pub stt: SttConfig,

    /// 文本生成服务配置
    #[serde(default)]
    pub llm: LlmConfig,

    /// 管线配置
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// 结果缓存配置
    #[serde(default)]
    pub cache: CacheConfig,

    /// 请求日志配置
    #[serde(default)]
    pub request_log: RequestLogConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// STT 服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct SttConfig {
    /// STT 服务基础 URL
    #[serde(default = "default_stt_url")]
    pub url: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_stt_timeout")]
    pub timeout_secs: u64,

    /// 最大重试次数
    #[serde(default)]
    pub max_retries: u32,
}

fn default_stt_url() -> String {
    "http://localhost:8100".to_string()
}

fn default_stt_timeout() -> u64 {
    300
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            url: default_stt_url(),
            timeout_secs: default_stt_timeout(),
            max_retries: 0,
        }
    }
}

/// 文本生成服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// 生成服务基础 URL
    #[serde(default = "default_llm_url")]
    pub url: String,

    /// 模型名
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// 最大重试次数
    #[serde(default)]
    pub max_retries: u32,
}

fn default_llm_url() -> String {
    "http://localhost:8200".to_string()
}

fn default_llm_model() -> String {
    "default".to_string()
}

fn default_llm_timeout() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: default_llm_url(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout(),
            max_retries: 0,
        }
    }
}

/// 管线配置
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSettings {
    /// 分块字符数上限
    #[serde(default = "default_chunk_max_chars")]
    pub chunk_max_chars: usize,

    /// map 阶段并发上限
    #[serde(default = "default_map_concurrency")]
    pub map_concurrency: usize,

    /// 上传媒体大小上限（字节）
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// 远程媒体下载超时时间（秒）
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_chunk_max_chars() -> usize {
    4000
}

fn default_map_concurrency() -> usize {
    8
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_fetch_timeout() -> u64 {
    60
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_max_chars: default_chunk_max_chars(),
            map_concurrency: default_map_concurrency(),
            max_upload_bytes: default_max_upload_bytes(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

/// 结果缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// 缓存后端
    /// 可选: memory, sled
    #[serde(default = "default_cache_backend")]
    pub backend: String,

    /// sled 数据库路径
    #[serde(default = "default_cache_path")]
    pub path: String,

    /// 条目存活时间（秒）
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

fn default_cache_backend() -> String {
    "memory".to_string()
}

fn default_cache_path() -> String {
    "data/cache.sled".to_string()
}

fn default_cache_ttl() -> u64 {
    24 * 60 * 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            path: default_cache_path(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

/// 请求日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct RequestLogConfig {
    /// 是否落盘请求日志
    #[serde(default = "default_request_log_enabled")]
    pub enabled: bool,

    /// JSONL 文件路径
    #[serde(default = "default_request_log_path")]
    pub path: String,
}

fn default_request_log_enabled() -> bool {
    true
}

fn default_request_log_path() -> String {
    "data/requests.jsonl".to_string()
}

impl Default for RequestLogConfig {
    fn default() -> Self {
        Self {
            enabled: default_request_log_enabled(),
            path: default_request_log_path(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    /// 可选: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否输出 JSON 格式日志
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
