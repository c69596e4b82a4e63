//! In-Memory 存储实现

mod result_cache;

pub use result_cache::{InMemoryResultCache, DEFAULT_TTL_SECS};
