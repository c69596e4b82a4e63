//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod request_log;
mod result_cache;
mod speech_to_text;
mod text_generation;

pub use request_log::{RequestLogEvent, RequestLogPort, RequestOutcome};
pub use result_cache::{
    fingerprint, request_cache_key, text_cache_key, CacheError, CacheStats, ResultCachePort,
};
pub use speech_to_text::{SpeechToTextPort, SttError, TranscribeRequest};
pub use text_generation::{GenerationError, TextGenerationPort};
