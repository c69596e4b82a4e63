//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `CLIPSUM_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `CLIPSUM_SERVER__HOST=127.0.0.1`
/// - `CLIPSUM_SERVER__PORT=8080`
/// - `CLIPSUM_STT__URL=http://stt-server:8100`
/// - `CLIPSUM_CACHE__BACKEND=sled`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 首先设置默认值（最低优先级）
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5080)?
        .set_default("stt.url", "http://localhost:8100")?
        .set_default("stt.timeout_secs", 300)?
        .set_default("stt.max_retries", 0)?
        .set_default("llm.url", "http://localhost:8200")?
        .set_default("llm.model", "default")?
        .set_default("llm.timeout_secs", 120)?
        .set_default("llm.max_retries", 0)?
        .set_default("pipeline.chunk_max_chars", 4000)?
        .set_default("pipeline.map_concurrency", 8)?
        .set_default("pipeline.max_upload_bytes", 50 * 1024 * 1024)?
        .set_default("pipeline.fetch_timeout_secs", 60)?
        .set_default("cache.backend", "memory")?
        .set_default("cache.path", "data/cache.sled")?
        .set_default("cache.ttl_secs", 24 * 60 * 60)?
        .set_default("request_log.enabled", true)?
        .set_default("request_log.path", "data/requests.jsonl")?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 添加配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        // 搜索默认配置文件
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 添加环境变量（最高优先级）
    // 前缀: CLIPSUM_
    // 层级分隔符: __ (双下划线)
    // 例如: CLIPSUM_LLM__MODEL=qwen2.5
    builder = builder.add_source(
        Environment::with_prefix("CLIPSUM")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    // 4. 构建配置
    let config = builder.build()?;

    // 5. 反序列化为 AppConfig
    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::ParseError(format!("Failed to deserialize config: {}", e)))?;

    // 6. 验证配置
    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    if config.stt.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "STT URL cannot be empty".to_string(),
        ));
    }

    if config.llm.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "LLM URL cannot be empty".to_string(),
        ));
    }

    if config.pipeline.chunk_max_chars == 0 {
        return Err(ConfigError::ValidationError(
            "Chunk size cannot be 0".to_string(),
        ));
    }

    if config.pipeline.map_concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "Map concurrency cannot be 0".to_string(),
        ));
    }

    match config.cache.backend.as_str() {
        "memory" | "sled" => {}
        other => {
            return Err(ConfigError::ValidationError(format!(
                "Unknown cache backend: {other} (expected memory or sled)"
            )));
        }
    }

    if config.cache.backend == "sled" && config.cache.path.is_empty() {
        return Err(ConfigError::ValidationError(
            "Cache path cannot be empty when backend is sled".to_string(),
        ));
    }

    if config.request_log.enabled && config.request_log.path.is_empty() {
        return Err(ConfigError::ValidationError(
            "Request log path cannot be empty when enabled".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}:{}", config.server.host, config.server.port);
    tracing::info!("STT URL: {}", config.stt.url);
    tracing::info!("STT Timeout: {}s", config.stt.timeout_secs);
    tracing::info!("LLM URL: {}", config.llm.url);
    tracing::info!("LLM Model: {}", config.llm.model);
    tracing::info!("Chunk Max Chars: {}", config.pipeline.chunk_max_chars);
    tracing::info!("Map Concurrency: {}", config.pipeline.map_concurrency);
    tracing::info!("Cache Backend: {}", config.cache.backend);
    if config.cache.backend == "sled" {
        tracing::info!("Cache Path: {}", config.cache.path);
    }
    tracing::info!("Cache TTL: {}s", config.cache.ttl_secs);
    tracing::info!("Request Log Enabled: {}", config.request_log.enabled);
    if config.request_log.enabled {
        tracing::info!("Request Log Path: {}", config.request_log.path);
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
