//! Result Cache Port - 内容寻址结果缓存
//!
//! 定义管线各阶段共用的 TTL 缓存抽象。过期条目在读到它的那次
//! `get` 中惰性删除，没有后台清扫；同 key 并发写入为 last-write-wins。
//! 接口可由网络化存储替换而不触碰管线逻辑。

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// 缓存错误
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Result Cache Port
///
/// key 约定按阶段加前缀：`result:` / `transcript:` / `format:` / `translate:`
#[async_trait]
pub trait ResultCachePort: Send + Sync {
    /// 读取缓存；缺失或过期均视为 None，过期条目在本次读取时删除
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// 写入缓存；覆盖同 key 的旧值
    async fn set(&self, key: &str, value: Value) -> Result<(), CacheError>;

    /// 获取缓存统计信息
    async fn stats(&self) -> CacheStats;
}

/// 缓存统计信息
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub hit_count: u64,
    pub miss_count: u64,
}

/// 对字段序列计算 128 位指纹
///
/// 每个字段先写入其 8 字节小端长度再写入内容，保证
/// `("ab","c")` 与 `("a","bc")` 不会产生同一个摘要。
/// 纯函数：无盐、无时间戳，跨进程重启稳定。
pub fn fingerprint<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut context = md5::Context::new();
    for field in fields {
        context.consume((field.len() as u64).to_le_bytes());
        context.consume(field);
    }
    format!("{:x}", context.compute())
}

/// 整体请求的缓存 key
///
/// 指纹覆盖：媒体字节 ⊕ 输入语言 ⊕ 输出语言 ⊕ 翻译目标语言
pub fn request_cache_key(
    media: &[u8],
    input_language: &str,
    output_language: &str,
    translate_target: Option<&str>,
) -> String {
    let target = translate_target.unwrap_or("");
    format!(
        "result:{}",
        fingerprint([
            media,
            input_language.as_bytes(),
            output_language.as_bytes(),
            target.as_bytes(),
        ])
    )
}

/// 子阶段的缓存 key：`(text, 参数...)` 的指纹加阶段前缀
pub fn text_cache_key(prefix: &str, text: &str, params: &[&str]) -> String {
    let mut fields: Vec<&[u8]> = vec![text.as_bytes()];
    fields.extend(params.iter().map(|p| p.as_bytes()));
    format!("{}:{}", prefix, fingerprint(fields))
}
