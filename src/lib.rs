//! Clipsum - 媒体转写与摘要系统
//!
//! 架构设计: Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Chunker: 句子对齐的文本分块
//!
//! 应用层 (application/):
//! - Ports: 端口定义（SpeechToText, TextGeneration, ResultCache, RequestLog）
//! - Pipeline: 转写 → 摘要 → 排版 → 翻译 的编排器与各阶段
//! - Progress: 请求内有序进度事件通道
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API + SSE 进度流
//! - Adapters: STT/LLM HTTP 客户端、远程媒体下载
//! - Persistence: DashMap 内存缓存 + Sled 持久缓存
//! - Logsink: 请求日志落盘（JSONL）

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use crate::config::{load_config, AppConfig};
