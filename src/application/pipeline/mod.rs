//! Pipeline - 处理管线
//!
//! 转写 → 摘要 → 排版 → 翻译(可选) 的阶段封装与编排：
//! - request: 请求描述与校验
//! - summarizer: map-reduce 摘要器
//! - stages: 转写/排版/翻译阶段封装（各自应用子缓存）
//! - orchestrator: 状态机编排、整体缓存、进度事件
//! - prompts: 生成服务提示词模板

pub mod orchestrator;
pub mod prompts;
pub mod request;
pub mod stages;
pub mod summarizer;

pub use orchestrator::{PipelineConfig, PipelineOrchestrator, PipelinePayload};
pub use request::{MediaLimits, PipelineRequest};
pub use stages::{FormattingStage, TranscriptionStage, TranslationStage};
pub use summarizer::{MapReduceSummarizer, SummarizerConfig, SummaryResult};

use tokio_util::sync::CancellationToken;

use crate::application::error::PipelineError;

/// 观察到取消则立即返回 Cancelled
pub(crate) fn ensure_live(cancel: &CancellationToken) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}

/// 让外部调用与取消信号赛跑
///
/// 取消赢得竞争时在途调用被放弃，结果不再被观察。
pub(crate) async fn race_cancel<F, T>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, PipelineError>
where
    F: std::future::Future<Output = Result<T, PipelineError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        result = fut => result,
    }
}
