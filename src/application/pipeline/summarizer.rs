//! Map-Reduce Summarizer - 分块摘要器
//!
//! map 阶段对每个分块并发发起一次摘要调用（并发度受信号量限制），
//! reduce 阶段在全部 map 结果齐备后发起恰好一次合成调用。
//! 结果位置由分块下标决定，与完成顺序无关。
//! 失败策略：fail-fast —— 任一 map 调用失败即放弃其余在途调用并使
//! 整个摘要失败；静默丢内容的部分摘要比显式失败更糟。

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::application::error::PipelineError;
use crate::application::pipeline::{prompts, race_cancel};
use crate::application::ports::TextGenerationPort;
use crate::application::progress::{ProgressEvent, ProgressSink, Stage};
use crate::domain::chunker::{chunk_text, DEFAULT_MAX_CHARS};

/// 摘要器配置
#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    /// 分块字符数上限
    pub chunk_max_chars: usize,
    /// map 阶段最大并发调用数
    pub max_concurrent: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            chunk_max_chars: DEFAULT_MAX_CHARS,
            max_concurrent: 8,
        }
    }
}

/// 摘要结果
///
/// `partials[i]` 对应第 i 个分块；`summary` 由全部 partials 合成。
#[derive(Debug, Clone, Default)]
pub struct SummaryResult {
    pub partials: Vec<String>,
    pub summary: String,
}

/// Map-Reduce 摘要器
pub struct MapReduceSummarizer {
    llm: Arc<dyn TextGenerationPort>,
    config: SummarizerConfig,
}

impl MapReduceSummarizer {
    pub fn new(llm: Arc<dyn TextGenerationPort>, config: SummarizerConfig) -> Self {
        Self { llm, config }
    }

    /// 对整段转写文本做分块摘要
    ///
    /// 每个 map 调用完成时发出一个 `progress` 事件；单分块输入同样
    /// 走完整的 map → reduce 路径。空文本直接返回空结果。
    pub async fn summarize(
        &self,
        transcript: &str,
        language: &str,
        progress: &ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<SummaryResult, PipelineError> {
        crate::application::pipeline::ensure_live(cancel)?;

        let chunks = chunk_text(transcript, self.config.chunk_max_chars);
        let total = chunks.len();
        if total == 0 {
            return Ok(SummaryResult::default());
        }

        tracing::debug!(total, "Summarizer map phase starting");

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));
        let mut tasks: JoinSet<Result<(usize, String), PipelineError>> = JoinSet::new();

        for (index, chunk) in chunks.into_iter().enumerate() {
            let llm = self.llm.clone();
            let semaphore = semaphore.clone();
            let prompt = prompts::chunk_summary(&chunk, language);

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| PipelineError::Internal("Semaphore closed".to_string()))?;
                let summary = llm
                    .generate(&prompt)
                    .await
                    .map_err(|e| PipelineError::upstream(Stage::Summarize, e))?;
                Ok((index, summary))
            });
        }

        // 结果按分块下标落位，不按完成顺序
        let mut slots: Vec<Option<String>> = vec![None; total];
        let mut done = 0usize;

        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    return Err(PipelineError::Cancelled);
                }
                joined = tasks.join_next() => joined,
            };

            let Some(joined) = joined else {
                break;
            };

            match joined {
                Ok(Ok((index, summary))) => {
                    slots[index] = Some(summary);
                    done += 1;
                    progress
                        .emit(ProgressEvent::Progress {
                            stage: Stage::Summarize,
                            done,
                            total,
                        })
                        .await;
                }
                // fail-fast：放弃其余在途 map 调用
                Ok(Err(e)) => {
                    tasks.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    tasks.abort_all();
                    return Err(PipelineError::Internal(format!(
                        "Summary task failed: {e}"
                    )));
                }
            }
        }

        // 屏障：到这里每个 slot 必然已填充
        let partials: Vec<String> = slots.into_iter().flatten().collect();
        if partials.len() != total {
            return Err(PipelineError::Internal(
                "Map phase completed with missing partials".to_string(),
            ));
        }

        tracing::debug!(total, "Summarizer reduce phase starting");

        let prompt = prompts::synthesis(&partials, language);
        let summary = race_cancel(cancel, async {
            self.llm
                .generate(&prompt)
                .await
                .map_err(|e| PipelineError::upstream(Stage::Summarize, e))
        })
        .await?;

        Ok(SummaryResult { partials, summary })
    }
}
