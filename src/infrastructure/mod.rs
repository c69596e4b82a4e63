//! Infrastructure Layer - 基础设施层
//!
//! 适配器、持久化、日志落盘与 HTTP 接入

pub mod adapters;
pub mod http;
pub mod logsink;
pub mod persistence;
