//! Pipeline Request - 请求描述符
//!
//! 每次调用创建一次，之后不再变更。

use crate::application::error::PipelineError;
use crate::application::ports::request_cache_key;

/// 允许的 MIME 类型前缀
const ALLOWED_MIME_PREFIXES: &[&str] = &["audio/", "video/"];

/// 媒体输入限制
#[derive(Debug, Clone)]
pub struct MediaLimits {
    /// 媒体字节数上限
    pub max_bytes: usize,
}

impl Default for MediaLimits {
    fn default() -> Self {
        Self {
            max_bytes: 50 * 1024 * 1024, // 50MB，与 HTTP body 限制一致
        }
    }
}

/// 管线请求描述符
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// 媒体文件原始字节
    pub media: Vec<u8>,
    /// MIME 类型
    pub mime_type: String,
    /// 原始文件名
    pub file_name: String,
    /// 媒体语言（转写提示）
    pub input_language: String,
    /// 产出语言（摘要/排版所用语言）
    pub output_language: String,
    /// 翻译目标语言；None 表示不翻译
    pub translate_target: Option<String>,
}

impl PipelineRequest {
    /// 输入校验；在任何外部调用之前执行
    pub fn validate(&self, limits: &MediaLimits) -> Result<(), PipelineError> {
        if self.media.is_empty() {
            return Err(PipelineError::Validation("Media file is empty".to_string()));
        }
        if self.media.len() > limits.max_bytes {
            return Err(PipelineError::Validation(format!(
                "Media file too large: {} bytes (limit {})",
                self.media.len(),
                limits.max_bytes
            )));
        }
        if !ALLOWED_MIME_PREFIXES
            .iter()
            .any(|prefix| self.mime_type.starts_with(prefix))
        {
            return Err(PipelineError::Validation(format!(
                "Unsupported media type: {}",
                self.mime_type
            )));
        }
        if self.input_language.trim().is_empty() || self.output_language.trim().is_empty() {
            return Err(PipelineError::Validation(
                "Language parameters cannot be empty".to_string(),
            ));
        }
        if matches!(self.translate_target.as_deref(), Some(target) if target.trim().is_empty()) {
            return Err(PipelineError::Validation(
                "Translation target cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// 整体缓存 key：媒体字节 + 全部语言参数的确定性指纹
    pub fn cache_key(&self) -> String {
        request_cache_key(
            &self.media,
            &self.input_language,
            &self.output_language,
            self.translate_target.as_deref(),
        )
    }
}
