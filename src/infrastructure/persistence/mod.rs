//! Persistence Layer - 结果缓存存储
//!
//! DashMap 内存实现（默认）与 Sled 持久化实现

pub mod memory;
pub mod sled;

pub use self::memory::InMemoryResultCache;
pub use self::sled::SledResultCache;
