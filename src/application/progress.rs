//! Progress Channel - 请求内进度事件通道
//!
//! 编排器在单一逻辑时间线上发出有序事件，由 HTTP 层桥接为 SSE 流。
//! 事件通道是显式注入编排器的 sink，不是模块级日志副作用。

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::application::pipeline::PipelinePayload;

/// 管线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Transcribe,
    Summarize,
    Format,
    Translate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Transcribe => "transcribe",
            Stage::Summarize => "summarize",
            Stage::Format => "format",
            Stage::Translate => "translate",
        }
    }

    /// 阶段即将运行时的 status 事件文案
    pub fn status_message(&self) -> &'static str {
        match self {
            Stage::Transcribe => "Transcribing audio",
            Stage::Summarize => "Summarizing transcript",
            Stage::Format => "Formatting transcript",
            Stage::Translate => "Translating transcript",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 进度事件
///
/// 一次请求的事件流在 `done` 或 `error` 之一后终止（恰好其一）。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// 阶段即将运行
    Status { msg: String },
    /// map 阶段完成计数（done 单调不减，最终等于 total）
    Progress {
        stage: Stage,
        done: usize,
        total: usize,
    },
    /// 缓存命中
    Cached { key: String },
    /// 管线完成，携带完整 payload
    Done(PipelinePayload),
    /// 管线失败
    Error { message: String },
}

impl ProgressEvent {
    /// SSE 事件名
    pub fn name(&self) -> &'static str {
        match self {
            ProgressEvent::Status { .. } => "status",
            ProgressEvent::Progress { .. } => "progress",
            ProgressEvent::Cached { .. } => "cached",
            ProgressEvent::Done(_) => "done",
            ProgressEvent::Error { .. } => "error",
        }
    }

    /// 阶段转换的 status 事件
    pub fn status(stage: Stage) -> Self {
        ProgressEvent::Status {
            msg: stage.status_message().to_string(),
        }
    }
}

/// 进度事件 sink
///
/// 接收端掉线（客户端断开）时事件被静默丢弃；取消由
/// CancellationToken 单独传达，不依赖发送失败。
#[derive(Clone)]
pub struct ProgressSink {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ProgressSink {
    /// 创建 sink 与对应的接收端
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// 发出一个事件
    pub async fn emit(&self, event: ProgressEvent) {
        if self.tx.send(event).await.is_err() {
            tracing::debug!("Progress receiver dropped, event discarded");
        }
    }
}
