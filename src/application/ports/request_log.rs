//! Request Log Port - 请求日志落盘抽象
//!
//! 记录每次管线请求的终态。落盘失败在适配器内部吞掉并打日志，
//! 绝不传播到管线的成功路径。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// 请求终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestOutcome {
    /// 完整跑完管线
    Completed,
    /// 缓存命中，直接返回
    Cached,
    /// 阶段失败
    Failed,
    /// 调用方取消
    Cancelled,
}

impl RequestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestOutcome::Completed => "completed",
            RequestOutcome::Cached => "cached",
            RequestOutcome::Failed => "failed",
            RequestOutcome::Cancelled => "cancelled",
        }
    }
}

/// 请求日志事件
#[derive(Debug, Clone, Serialize)]
pub struct RequestLogEvent {
    pub cache_key: String,
    pub file_name: String,
    pub mime_type: String,
    pub outcome: RequestOutcome,
    /// 失败原因等附加信息
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Request Log Port
#[async_trait]
pub trait RequestLogPort: Send + Sync {
    /// 记录一条请求日志，返回记录 id；失败时返回 None
    async fn record(&self, event: RequestLogEvent) -> Option<Uuid>;
}
