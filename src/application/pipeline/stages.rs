//! Stage Wrappers - 转写 / 排版 / 翻译阶段封装
//!
//! 每个阶段包装一次外部服务调用并应用自己的子缓存。
//! 失败契约各不相同：
//! - 转写失败对管线致命
//! - 排版失败降级返回原文（非致命）
//! - 翻译失败在显式请求翻译时致命，绝不拿原文冒充译文

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::application::error::PipelineError;
use crate::application::pipeline::{prompts, race_cancel, PipelineRequest};
use crate::application::ports::{
    fingerprint, text_cache_key, ResultCachePort, SpeechToTextPort, TextGenerationPort,
    TranscribeRequest,
};
use crate::application::progress::Stage;

/// 从缓存读取字符串值；读错误按未命中处理
async fn read_cached_text(cache: &Arc<dyn ResultCachePort>, key: &str) -> Option<String> {
    match cache.get(key).await {
        Ok(Some(value)) => value.as_str().map(|s| s.to_string()),
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Cache read failed, treating as miss");
            None
        }
    }
}

/// 写入字符串值；写失败只记日志
async fn write_cached_text(cache: &Arc<dyn ResultCachePort>, key: &str, text: &str) {
    if let Err(e) = cache.set(key, Value::String(text.to_string())).await {
        tracing::warn!(key = %key, error = %e, "Cache write failed");
    }
}

/// 转写阶段
pub struct TranscriptionStage {
    stt: Arc<dyn SpeechToTextPort>,
    cache: Arc<dyn ResultCachePort>,
}

impl TranscriptionStage {
    pub fn new(stt: Arc<dyn SpeechToTextPort>, cache: Arc<dyn ResultCachePort>) -> Self {
        Self { stt, cache }
    }

    /// 转写媒体字节；子缓存命中时不调用外部服务
    pub async fn transcribe(
        &self,
        request: &PipelineRequest,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        let key = format!(
            "transcript:{}",
            fingerprint([request.media.as_slice(), request.input_language.as_bytes()])
        );

        if let Some(text) = read_cached_text(&self.cache, &key).await {
            tracing::debug!(key = %key, "Transcript cache hit");
            return Ok(text);
        }

        let stt_request = TranscribeRequest {
            media: request.media.clone(),
            mime_type: request.mime_type.clone(),
            file_name: request.file_name.clone(),
            language_hint: request.input_language.clone(),
        };

        let text = race_cancel(cancel, async {
            self.stt
                .transcribe(stt_request)
                .await
                .map_err(|e| PipelineError::upstream(Stage::Transcribe, e))
        })
        .await?;

        write_cached_text(&self.cache, &key, &text).await;
        Ok(text)
    }
}

/// 排版阶段
pub struct FormattingStage {
    llm: Arc<dyn TextGenerationPort>,
    cache: Arc<dyn ResultCachePort>,
}

impl FormattingStage {
    pub fn new(llm: Arc<dyn TextGenerationPort>, cache: Arc<dyn ResultCachePort>) -> Self {
        Self { llm, cache }
    }

    /// 排版转写文本
    ///
    /// 服务失败时降级返回原文；只有取消会作为错误返回。
    pub async fn format(
        &self,
        text: &str,
        language: &str,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        let key = text_cache_key("format", text, &[language]);

        if let Some(formatted) = read_cached_text(&self.cache, &key).await {
            tracing::debug!(key = %key, "Formatted transcript cache hit");
            return Ok(formatted);
        }

        let prompt = prompts::format_transcript(text, language);
        let generated = race_cancel(cancel, async {
            Ok::<_, PipelineError>(self.llm.generate(&prompt).await)
        })
        .await?;

        match generated {
            Ok(formatted) => {
                write_cached_text(&self.cache, &key, &formatted).await;
                Ok(formatted)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Formatting failed, returning raw transcript");
                Ok(text.to_string())
            }
        }
    }
}

/// 翻译阶段
pub struct TranslationStage {
    llm: Arc<dyn TextGenerationPort>,
    cache: Arc<dyn ResultCachePort>,
}

impl TranslationStage {
    pub fn new(llm: Arc<dyn TextGenerationPort>, cache: Arc<dyn ResultCachePort>) -> Self {
        Self { llm, cache }
    }

    /// 翻译文本
    ///
    /// source == target（忽略大小写与首尾空白）时原样返回，零外部调用。
    pub async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        if normalize_language(source) == normalize_language(target) {
            return Ok(text.to_string());
        }

        let key = text_cache_key("translate", text, &[source, target]);

        if let Some(translated) = read_cached_text(&self.cache, &key).await {
            tracing::debug!(key = %key, "Translation cache hit");
            return Ok(translated);
        }

        let prompt = prompts::translate(text, source, target);
        let translated = race_cancel(cancel, async {
            self.llm
                .generate(&prompt)
                .await
                .map_err(|e| PipelineError::upstream(Stage::Translate, e))
        })
        .await?;

        write_cached_text(&self.cache, &key, &translated).await;
        Ok(translated)
    }
}

fn normalize_language(language: &str) -> String {
    language.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    use crate::application::ports::GenerationError;
    use crate::infrastructure::persistence::memory::InMemoryResultCache;

    struct CountingLlm {
        calls: AtomicU64,
        fail: bool,
    }

    impl CountingLlm {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU64::new(0),
                fail,
            })
        }

        fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextGenerationPort for CountingLlm {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(GenerationError::UpstreamError("down".to_string()));
            }
            Ok(format!("OUT::{}", prompt.lines().last().unwrap_or("")))
        }
    }

    fn cache() -> Arc<dyn ResultCachePort> {
        Arc::new(InMemoryResultCache::with_ttl_secs(3600))
    }

    #[tokio::test]
    async fn test_translate_identity_makes_no_external_call() {
        let llm = CountingLlm::new(false);
        let stage = TranslationStage::new(llm.clone(), cache());

        let out = stage
            .translate("hello", "EN", " en ", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out, "hello");
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_translate_failure_is_fatal() {
        let llm = CountingLlm::new(true);
        let stage = TranslationStage::new(llm, cache());

        let err = stage
            .translate("hello", "en", "fr", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Upstream {
                stage: Stage::Translate,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_format_failure_degrades_to_original_text() {
        let llm = CountingLlm::new(true);
        let stage = FormattingStage::new(llm.clone(), cache());

        let out = stage
            .format("raw transcript", "en", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out, "raw transcript");
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_format_uses_sub_cache_on_repeat() {
        let llm = CountingLlm::new(false);
        let stage = FormattingStage::new(llm.clone(), cache());
        let cancel = CancellationToken::new();

        let first = stage.format("text body", "en", &cancel).await.unwrap();
        let second = stage.format("text body", "en", &cancel).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_format_cancelled_is_not_degraded() {
        let llm = CountingLlm::new(false);
        let stage = FormattingStage::new(llm, cache());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = stage.format("text", "en", &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
