//! Pipeline Orchestrator - 管线编排器
//!
//! 对单个请求按 转写 → 摘要 → 排版 → 翻译(可选) 的固定顺序编排各阶段：
//! - 入口先对完整请求描述符计算缓存 key；命中时发出 `cached` + `done`
//!   直接结束，相同输入绝不重新调用外部服务
//! - 每个阶段运行前发出 `status` 事件；每个阶段边界检查取消
//! - 成功后组装 payload 写入缓存再发 `done`；取消后的运行不写缓存
//! - 除排版的降级外，任何阶段失败都中止后续阶段并发出单个 `error` 事件

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::application::error::PipelineError;
use crate::application::pipeline::{
    ensure_live, FormattingStage, MapReduceSummarizer, MediaLimits, PipelineRequest,
    SummarizerConfig, TranscriptionStage, TranslationStage,
};
use crate::application::ports::{
    RequestLogEvent, RequestLogPort, RequestOutcome, ResultCachePort, SpeechToTextPort,
    TextGenerationPort,
};
use crate::application::progress::{ProgressEvent, ProgressSink, Stage};

/// 管线配置
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub limits: MediaLimits,
    pub summarizer: SummarizerConfig,
}

/// 管线结果 payload
///
/// 成功运行时创建一次，原样写入缓存；后续命中时逐字节原样返回。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelinePayload {
    pub cache_key: String,
    pub transcript: String,
    pub formatted_transcript: String,
    pub summary: String,
    pub summary_partials: Vec<String>,
    pub translate_target: Option<String>,
    pub translation: Option<String>,
    pub language: String,
}

/// 管线编排器
pub struct PipelineOrchestrator {
    transcription: TranscriptionStage,
    summarizer: MapReduceSummarizer,
    formatting: FormattingStage,
    translation: TranslationStage,
    cache: Arc<dyn ResultCachePort>,
    request_log: Arc<dyn RequestLogPort>,
    config: PipelineConfig,
}

impl PipelineOrchestrator {
    pub fn new(
        stt: Arc<dyn SpeechToTextPort>,
        llm: Arc<dyn TextGenerationPort>,
        cache: Arc<dyn ResultCachePort>,
        request_log: Arc<dyn RequestLogPort>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            transcription: TranscriptionStage::new(stt, cache.clone()),
            summarizer: MapReduceSummarizer::new(llm.clone(), config.summarizer.clone()),
            formatting: FormattingStage::new(llm.clone(), cache.clone()),
            translation: TranslationStage::new(llm, cache.clone()),
            cache,
            request_log,
            config,
        }
    }

    /// 运行管线
    ///
    /// 事件流以 `done` 或 `error` 恰好其一终止；取消不发终止事件
    /// （传输层已经知道客户端不在了）。
    pub async fn run(
        &self,
        request: PipelineRequest,
        progress: &ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<PipelinePayload, PipelineError> {
        let file_name = request.file_name.clone();
        let mime_type = request.mime_type.clone();
        let cache_key = request.cache_key();

        let outcome = self.execute(&request, progress, cancel).await;

        match &outcome {
            Ok((_, cache_hit)) => {
                let logged = if *cache_hit {
                    RequestOutcome::Cached
                } else {
                    RequestOutcome::Completed
                };
                self.spawn_log(cache_key, file_name, mime_type, logged, None);
            }
            Err(PipelineError::Cancelled) => {
                tracing::info!(cache_key = %cache_key, "Pipeline cancelled by caller");
                self.spawn_log(
                    cache_key,
                    file_name,
                    mime_type,
                    RequestOutcome::Cancelled,
                    None,
                );
            }
            Err(e) => {
                tracing::error!(cache_key = %cache_key, error = %e, "Pipeline failed");
                progress
                    .emit(ProgressEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                self.spawn_log(
                    cache_key,
                    file_name,
                    mime_type,
                    RequestOutcome::Failed,
                    Some(e.to_string()),
                );
            }
        }

        outcome.map(|(payload, _)| payload)
    }

    async fn execute(
        &self,
        request: &PipelineRequest,
        progress: &ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<(PipelinePayload, bool), PipelineError> {
        request.validate(&self.config.limits)?;
        let cache_key = request.cache_key();

        match self.cache.get(&cache_key).await {
            Ok(Some(value)) => match serde_json::from_value::<PipelinePayload>(value) {
                Ok(payload) => {
                    tracing::info!(cache_key = %cache_key, "Pipeline cache hit");
                    progress
                        .emit(ProgressEvent::Cached {
                            key: cache_key.clone(),
                        })
                        .await;
                    progress.emit(ProgressEvent::Done(payload.clone())).await;
                    return Ok((payload, true));
                }
                Err(e) => {
                    tracing::warn!(
                        cache_key = %cache_key,
                        error = %e,
                        "Cached payload undecodable, recomputing"
                    );
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(cache_key = %cache_key, error = %e, "Cache read failed, treating as miss");
            }
        }

        ensure_live(cancel)?;
        progress.emit(ProgressEvent::status(Stage::Transcribe)).await;
        let transcript = self.transcription.transcribe(request, cancel).await?;

        ensure_live(cancel)?;
        progress.emit(ProgressEvent::status(Stage::Summarize)).await;
        let summary = self
            .summarizer
            .summarize(&transcript, &request.output_language, progress, cancel)
            .await?;

        ensure_live(cancel)?;
        progress.emit(ProgressEvent::status(Stage::Format)).await;
        let formatted = self
            .formatting
            .format(&transcript, &request.output_language, cancel)
            .await?;

        let translation = match request.translate_target.as_deref() {
            Some(target) => {
                ensure_live(cancel)?;
                progress.emit(ProgressEvent::status(Stage::Translate)).await;
                Some(
                    self.translation
                        .translate(&formatted, &request.output_language, target, cancel)
                        .await?,
                )
            }
            None => None,
        };

        let payload = PipelinePayload {
            cache_key: cache_key.clone(),
            transcript,
            formatted_transcript: formatted,
            summary: summary.summary,
            summary_partials: summary.partials,
            translate_target: request.translate_target.clone(),
            translation,
            language: request.output_language.clone(),
        };

        // 取消后的运行不得写缓存：半途结果会污染后续命中
        ensure_live(cancel)?;
        match serde_json::to_value(&payload) {
            Ok(value) => {
                if let Err(e) = self.cache.set(&cache_key, value).await {
                    // 结果已算出，缓存写失败不影响本次请求
                    tracing::warn!(cache_key = %cache_key, error = %e, "Failed to cache pipeline result");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize payload for caching");
            }
        }

        progress.emit(ProgressEvent::Done(payload.clone())).await;
        Ok((payload, false))
    }

    /// 请求日志走独立任务，绝不阻塞成功路径
    fn spawn_log(
        &self,
        cache_key: String,
        file_name: String,
        mime_type: String,
        outcome: RequestOutcome,
        detail: Option<String>,
    ) {
        let log = self.request_log.clone();
        let event = RequestLogEvent {
            cache_key,
            file_name,
            mime_type,
            outcome,
            detail,
            occurred_at: Utc::now(),
        };
        tokio::spawn(async move {
            log.record(event).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    use crate::application::ports::{GenerationError, SttError, TranscribeRequest};
    use crate::infrastructure::logsink::NoopRequestLog;
    use crate::infrastructure::persistence::memory::InMemoryResultCache;

    const TRANSCRIPT: &str = "Alpha one. Beta two. Gamma three. Delta four.";

    const MAP_PREFIX: &str = "Summarize the following transcript section";
    const REDUCE_PREFIX: &str = "Combine the following section summaries";
    const FORMAT_PREFIX: &str = "Reformat the following raw transcript";
    const TRANSLATE_PREFIX: &str = "Translate the following text";

    struct ScriptedStt {
        calls: AtomicU64,
    }

    impl ScriptedStt {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU64::new(0),
            })
        }

        fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SpeechToTextPort for ScriptedStt {
        async fn transcribe(&self, _request: TranscribeRequest) -> Result<String, SttError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(TRANSCRIPT.to_string())
        }
    }

    /// 按提示词前缀产出可辨认的输出；可配置指定前缀失败或在
    /// map 调用时触发取消
    struct ScriptedLlm {
        prompts: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
        cancel_on_map: Option<CancellationToken>,
    }

    impl ScriptedLlm {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                fail_on: None,
                cancel_on_map: None,
            })
        }

        fn failing_on(prefix: &'static str) -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                fail_on: Some(prefix),
                cancel_on_map: None,
            })
        }

        fn cancelling_on_map(token: CancellationToken) -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                fail_on: None,
                cancel_on_map: Some(token),
            })
        }

        fn total_calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        fn calls_with_prefix(&self, prefix: &str) -> usize {
            self.prompts
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.starts_with(prefix))
                .count()
        }
    }

    #[async_trait]
    impl TextGenerationPort for ScriptedLlm {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());

            if let Some(token) = &self.cancel_on_map {
                if prompt.starts_with(MAP_PREFIX) {
                    token.cancel();
                }
            }
            if let Some(prefix) = self.fail_on {
                if prompt.starts_with(prefix) {
                    return Err(GenerationError::UpstreamError("service down".to_string()));
                }
            }

            let tail = prompt.lines().last().unwrap_or("");
            if prompt.starts_with(REDUCE_PREFIX) {
                Ok("FINAL".to_string())
            } else if prompt.starts_with(MAP_PREFIX) {
                Ok(format!("PART::{tail}"))
            } else if prompt.starts_with(FORMAT_PREFIX) {
                Ok(format!("FMT::{tail}"))
            } else {
                Ok(format!("TR::{tail}"))
            }
        }
    }

    struct Harness {
        stt: Arc<ScriptedStt>,
        llm: Arc<ScriptedLlm>,
        cache: Arc<InMemoryResultCache>,
        orchestrator: PipelineOrchestrator,
    }

    fn harness(llm: Arc<ScriptedLlm>) -> Harness {
        let stt = ScriptedStt::new();
        let cache = Arc::new(InMemoryResultCache::with_ttl_secs(3600));
        let config = PipelineConfig {
            limits: MediaLimits::default(),
            // 小分块保证 map 阶段有多个调用
            summarizer: SummarizerConfig {
                chunk_max_chars: 20,
                max_concurrent: 2,
            },
        };
        let orchestrator = PipelineOrchestrator::new(
            stt.clone(),
            llm.clone(),
            cache.clone(),
            Arc::new(NoopRequestLog),
            config,
        );
        Harness {
            stt,
            llm,
            cache,
            orchestrator,
        }
    }

    fn request(output_language: &str, translate_target: Option<&str>) -> PipelineRequest {
        PipelineRequest {
            media: b"media-bytes".to_vec(),
            mime_type: "audio/mpeg".to_string(),
            file_name: "talk.mp3".to_string(),
            input_language: "auto".to_string(),
            output_language: output_language.to_string(),
            translate_target: translate_target.map(|s| s.to_string()),
        }
    }

    async fn run_collect(
        harness: &Harness,
        request: PipelineRequest,
        cancel: &CancellationToken,
    ) -> (
        Result<PipelinePayload, PipelineError>,
        Vec<ProgressEvent>,
    ) {
        let (sink, mut rx) = ProgressSink::channel(64);
        let result = harness.orchestrator.run(request, &sink, cancel).await;
        drop(sink);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (result, events)
    }

    fn terminal_count(events: &[ProgressEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Done(_) | ProgressEvent::Error { .. }))
            .count()
    }

    #[tokio::test]
    async fn test_full_run_emits_ordered_events() {
        let h = harness(ScriptedLlm::ok());
        let (result, events) =
            run_collect(&h, request("en", None), &CancellationToken::new()).await;

        let payload = result.unwrap();
        assert_eq!(payload.transcript, TRANSCRIPT);
        assert_eq!(payload.summary, "FINAL");
        assert!(payload.formatted_transcript.starts_with("FMT::"));
        assert!(payload.translation.is_none());
        assert!(payload.summary_partials.len() >= 2);

        assert!(matches!(&events[0], ProgressEvent::Status { msg } if msg == "Transcribing audio"));
        assert!(
            matches!(&events[1], ProgressEvent::Status { msg } if msg == "Summarizing transcript")
        );

        let progress: Vec<(usize, usize)> = events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Progress { done, total, .. } => Some((*done, *total)),
                _ => None,
            })
            .collect();
        let total = progress[0].1;
        assert_eq!(total, payload.summary_partials.len());
        assert_eq!(*progress.last().unwrap(), (total, total));
        for pair in progress.windows(2) {
            assert!(pair[0].0 < pair[1].0);
        }

        assert!(matches!(
            &events[events.len() - 2],
            ProgressEvent::Status { msg } if msg == "Formatting transcript"
        ));
        assert!(matches!(events.last().unwrap(), ProgressEvent::Done(_)));
        assert_eq!(terminal_count(&events), 1);
    }

    #[tokio::test]
    async fn test_second_run_is_served_from_cache() {
        let h = harness(ScriptedLlm::ok());

        let (first, _) = run_collect(&h, request("en", None), &CancellationToken::new()).await;
        let stt_calls = h.stt.calls();
        let llm_calls = h.llm.total_calls();

        let (second, events) =
            run_collect(&h, request("en", None), &CancellationToken::new()).await;

        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(h.stt.calls(), stt_calls);
        assert_eq!(h.llm.total_calls(), llm_calls);

        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], ProgressEvent::Cached { .. }));
        assert!(matches!(&events[1], ProgressEvent::Done(_)));
    }

    #[tokio::test]
    async fn test_changed_output_language_recomputes_but_reuses_transcript() {
        let h = harness(ScriptedLlm::ok());

        let (first, _) =
            run_collect(&h, request("en", Some("de")), &CancellationToken::new()).await;
        first.unwrap();
        let llm_calls = h.llm.total_calls();
        let translate_calls = h.llm.calls_with_prefix(TRANSLATE_PREFIX);

        let (second, events) =
            run_collect(&h, request("fr", Some("de")), &CancellationToken::new()).await;
        second.unwrap();

        // 转写子缓存只依赖媒体与 input_language；其余阶段全量重跑
        assert_eq!(h.stt.calls(), 1);
        assert!(h.llm.total_calls() > llm_calls);
        assert_eq!(h.llm.calls_with_prefix(TRANSLATE_PREFIX), translate_calls + 1);
        assert!(matches!(&events[0], ProgressEvent::Status { .. }));
        assert!(matches!(events.last().unwrap(), ProgressEvent::Done(_)));
    }

    #[tokio::test]
    async fn test_precancelled_run_makes_no_calls_and_no_events() {
        let h = harness(ScriptedLlm::ok());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let key = request("en", None).cache_key();
        let (result, events) = run_collect(&h, request("en", None), &cancel).await;

        assert!(result.unwrap_err().is_cancelled());
        assert!(events.is_empty());
        assert_eq!(h.stt.calls(), 0);
        assert_eq!(h.llm.total_calls(), 0);
        assert!(h.cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancel_during_map_skips_cache_write() {
        let cancel = CancellationToken::new();
        let h = harness(ScriptedLlm::cancelling_on_map(cancel.clone()));

        let key = request("en", None).cache_key();
        let (result, events) = run_collect(&h, request("en", None), &cancel).await;

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(terminal_count(&events), 0);
        assert!(h.cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_map_failure_aborts_pipeline() {
        let h = harness(ScriptedLlm::failing_on(MAP_PREFIX));

        let key = request("en", None).cache_key();
        let (result, events) = run_collect(&h, request("en", None), &CancellationToken::new()).await;

        assert!(matches!(
            result.unwrap_err(),
            PipelineError::Upstream {
                stage: Stage::Summarize,
                ..
            }
        ));
        assert!(matches!(events.last().unwrap(), ProgressEvent::Error { .. }));
        assert_eq!(terminal_count(&events), 1);
        // 后续阶段未运行
        assert_eq!(h.llm.calls_with_prefix(FORMAT_PREFIX), 0);
        assert!(h.cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_format_failure_degrades_to_raw_transcript() {
        let h = harness(ScriptedLlm::failing_on(FORMAT_PREFIX));

        let (result, events) =
            run_collect(&h, request("en", None), &CancellationToken::new()).await;

        let payload = result.unwrap();
        assert_eq!(payload.formatted_transcript, TRANSCRIPT);
        assert!(matches!(events.last().unwrap(), ProgressEvent::Done(_)));
    }

    #[tokio::test]
    async fn test_identity_translation_short_circuits() {
        let h = harness(ScriptedLlm::ok());

        let (result, _) =
            run_collect(&h, request("en", Some(" EN ")), &CancellationToken::new()).await;

        let payload = result.unwrap();
        assert_eq!(
            payload.translation.as_deref(),
            Some(payload.formatted_transcript.as_str())
        );
        assert_eq!(h.llm.calls_with_prefix(TRANSLATE_PREFIX), 0);
    }

    #[tokio::test]
    async fn test_distinct_target_runs_translation() {
        let h = harness(ScriptedLlm::ok());

        let (result, events) =
            run_collect(&h, request("en", Some("fr")), &CancellationToken::new()).await;

        let payload = result.unwrap();
        assert!(payload.translation.as_deref().unwrap().starts_with("TR::"));
        assert_eq!(h.llm.calls_with_prefix(TRANSLATE_PREFIX), 1);
        assert!(events.iter().any(
            |e| matches!(e, ProgressEvent::Status { msg } if msg == "Translating transcript")
        ));
    }

    #[tokio::test]
    async fn test_validation_rejects_before_any_external_call() {
        let h = harness(ScriptedLlm::ok());
        let mut bad = request("en", None);
        bad.media.clear();

        let (result, events) = run_collect(&h, bad, &CancellationToken::new()).await;

        assert!(matches!(
            result.unwrap_err(),
            PipelineError::Validation(_)
        ));
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ProgressEvent::Error { .. }));
        assert_eq!(h.stt.calls(), 0);
        assert_eq!(h.llm.total_calls(), 0);
    }
}
