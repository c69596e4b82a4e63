//! Clipsum - 媒体转写与摘要系统
//!
//! 架构:
//! - Domain: 文本分块
//! - Application: 管线编排、ports、进度事件
//! - Infrastructure: http, adapters, persistence, logsink

use std::sync::Arc;

use clipsum::application::pipeline::{
    MediaLimits, PipelineConfig, PipelineOrchestrator, SummarizerConfig,
};
use clipsum::application::ports::{RequestLogPort, ResultCachePort};
use clipsum::config::{load_config, print_config};
use clipsum::infrastructure::adapters::{
    HttpLlmClient, HttpLlmClientConfig, HttpSttClient, HttpSttClientConfig, RemoteMediaFetcher,
    RemoteMediaFetcherConfig,
};
// use clipsum::infrastructure::adapters::{FakeLlmClient, FakeSttClient};
use clipsum::infrastructure::http::{AppState, HttpServer, ServerConfig};
use clipsum::infrastructure::logsink::{JsonlRequestLog, NoopRequestLog};
use clipsum::infrastructure::persistence::sled::SledResultCacheConfig;
use clipsum::infrastructure::persistence::{InMemoryResultCache, SledResultCache};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // 初始化日志
    let log_filter = format!(
        "{},clipsum={},tower_http=debug",
        config.log.level, config.log.level
    );
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));
    if config.log.json {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    tracing::info!("Clipsum - 媒体转写与摘要系统");
    print_config(&config);

    // 创建结果缓存
    let cache: Arc<dyn ResultCachePort> = match config.cache.backend.as_str() {
        "sled" => {
            if let Some(parent) = std::path::Path::new(&config.cache.path).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let cache_config = SledResultCacheConfig {
                db_path: config.cache.path.clone(),
                ttl_secs: config.cache.ttl_secs,
            };
            Arc::new(
                SledResultCache::new(&cache_config)
                    .map_err(|e| anyhow::anyhow!("Failed to open cache: {}", e))?,
            )
        }
        _ => Arc::new(InMemoryResultCache::with_ttl_secs(config.cache.ttl_secs)),
    };

    // 创建 HTTP STT 客户端
    let stt_config = HttpSttClientConfig {
        base_url: config.stt.url.clone(),
        timeout_secs: config.stt.timeout_secs,
        max_retries: config.stt.max_retries,
    };
    let stt = Arc::new(
        HttpSttClient::new(stt_config)
            .map_err(|e| anyhow::anyhow!("Failed to create STT client: {}", e))?,
    );

    // 创建 HTTP LLM 客户端
    let llm_config = HttpLlmClientConfig {
        base_url: config.llm.url.clone(),
        model: config.llm.model.clone(),
        timeout_secs: config.llm.timeout_secs,
        max_retries: config.llm.max_retries,
    };
    let llm = Arc::new(
        HttpLlmClient::new(llm_config)
            .map_err(|e| anyhow::anyhow!("Failed to create LLM client: {}", e))?,
    );

    // // 本地开发时使用 Fake 客户端，不依赖外部服务
    // let stt = Arc::new(FakeSttClient::with_defaults());
    // let llm = Arc::new(FakeLlmClient::with_defaults());

    // 创建请求日志
    let request_log: Arc<dyn RequestLogPort> = if config.request_log.enabled {
        Arc::new(JsonlRequestLog::new(&config.request_log.path))
    } else {
        Arc::new(NoopRequestLog)
    };

    // 创建管线编排器
    let pipeline_config = PipelineConfig {
        limits: MediaLimits {
            max_bytes: config.pipeline.max_upload_bytes,
        },
        summarizer: SummarizerConfig {
            chunk_max_chars: config.pipeline.chunk_max_chars,
            max_concurrent: config.pipeline.map_concurrency,
        },
    };
    let pipeline = Arc::new(PipelineOrchestrator::new(
        stt,
        llm,
        cache.clone(),
        request_log,
        pipeline_config,
    ));

    // 创建远程媒体下载器
    let fetcher_config = RemoteMediaFetcherConfig {
        timeout_secs: config.pipeline.fetch_timeout_secs,
        max_bytes: config.pipeline.max_upload_bytes,
    };
    let fetcher = Arc::new(
        RemoteMediaFetcher::new(fetcher_config)
            .map_err(|e| anyhow::anyhow!("Failed to create media fetcher: {}", e))?,
    );

    // 创建 HTTP 服务器
    let server_config = ServerConfig::new(
        &config.server.host,
        config.server.port,
        config.pipeline.max_upload_bytes,
    );
    let state = AppState::new(pipeline, cache, fetcher);
    let server = HttpServer::new(server_config, state);

    tracing::info!("Starting HTTP server...");

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                return;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
