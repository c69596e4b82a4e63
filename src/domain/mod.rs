//! Domain Layer - 领域层
//!
//! 纯领域逻辑，不依赖任何基础设施：
//! - chunker: 句子对齐的文本分块

pub mod chunker;

pub use chunker::{chunk_text, DEFAULT_MAX_CHARS};
