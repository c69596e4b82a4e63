//! 应用层错误定义
//!
//! 管线统一错误分类。传播策略：
//! - Validation 在任何外部调用之前检查并立即返回
//! - Upstream 对所在阶段致命；除排版阶段降级外对整个管线致命
//! - Cancelled 静默终止，不产生 error 事件
//! - 缓存写入失败不在此枚举中：结果已算出，只记日志

use thiserror::Error;

use crate::application::progress::Stage;

/// 管线错误
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 输入校验失败（缺文件、类型不支持、超大小等）
    #[error("Validation error: {0}")]
    Validation(String),

    /// 外部服务调用失败
    #[error("{stage} stage failed: {message}")]
    Upstream { stage: Stage, message: String },

    /// 调用方撤回请求
    #[error("Pipeline cancelled")]
    Cancelled,

    /// 内部错误
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// 创建阶段上游错误
    pub fn upstream(stage: Stage, err: impl std::fmt::Display) -> Self {
        Self::Upstream {
            stage,
            message: err.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
