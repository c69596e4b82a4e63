//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（SpeechToText、TextGeneration、ResultCache、RequestLog）
//! - pipeline: 管线编排器、map-reduce 摘要器与各阶段封装
//! - progress: 请求内有序进度事件
//! - error: 管线错误定义

pub mod error;
pub mod pipeline;
pub mod ports;
pub mod progress;

pub use error::PipelineError;

pub use pipeline::{
    MapReduceSummarizer, MediaLimits, PipelineConfig, PipelineOrchestrator, PipelinePayload,
    PipelineRequest, SummarizerConfig, SummaryResult,
};

pub use ports::{
    fingerprint, request_cache_key, text_cache_key, CacheError, CacheStats, GenerationError,
    RequestLogEvent, RequestLogPort, RequestOutcome, ResultCachePort, SpeechToTextPort, SttError,
    TextGenerationPort, TranscribeRequest,
};

pub use progress::{ProgressEvent, ProgressSink, Stage};
