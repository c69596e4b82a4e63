//! In-Memory Result Cache - DashMap 实现
//!
//! 进程内 TTL 缓存：不按容量淘汰，过期条目在读到它的那次 get 中删除。
//! 同 key 并发读写由 DashMap 分片锁保证不损坏，写覆盖为 last-write-wins。

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::application::ports::{CacheError, CacheStats, ResultCachePort};

/// 默认 TTL：24 小时
pub const DEFAULT_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
struct StoredEntry {
    value: Value,
    stored_at: DateTime<Utc>,
}

enum Lookup {
    Missing,
    Expired,
    Fresh(Value),
}

/// DashMap 结果缓存
pub struct InMemoryResultCache {
    entries: DashMap<String, StoredEntry>,
    ttl: Duration,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl InMemoryResultCache {
    pub fn new() -> Self {
        Self::with_ttl_secs(DEFAULT_TTL_SECS)
    }

    pub fn with_ttl_secs(ttl_secs: u64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::seconds(ttl_secs as i64),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        }
    }
}

impl Default for InMemoryResultCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResultCachePort for InMemoryResultCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        // 先取值再删除，不在持有分片引用时移除
        let lookup = match self.entries.get(key) {
            None => Lookup::Missing,
            Some(entry) => {
                if Utc::now() - entry.stored_at > self.ttl {
                    Lookup::Expired
                } else {
                    Lookup::Fresh(entry.value.clone())
                }
            }
        };

        match lookup {
            Lookup::Fresh(value) => {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Ok(Some(value))
            }
            Lookup::Expired => {
                // 惰性删除
                self.entries.remove(key);
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "Cache entry expired, evicted");
                Ok(None)
            }
            Lookup::Missing => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            StoredEntry {
                value,
                stored_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.entries.len(),
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let cache = InMemoryResultCache::new();
        cache.set("k", json!({"a": 1})).await.unwrap();

        let value = cache.get("k").await.unwrap();
        assert_eq!(value, Some(json!({"a": 1})));

        let stats = cache.stats().await;
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.hit_count, 1);
    }

    #[tokio::test]
    async fn test_missing_key_counts_miss() {
        let cache = InMemoryResultCache::new();
        assert_eq!(cache.get("nope").await.unwrap(), None);
        assert_eq!(cache.stats().await.miss_count, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_never_returned_and_evicted() {
        let cache = InMemoryResultCache::with_ttl_secs(0);
        cache.set("k", json!("v")).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert_eq!(cache.get("k").await.unwrap(), None);
        // 惰性删除在这次读取中生效
        assert_eq!(cache.stats().await.total_entries, 0);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let cache = InMemoryResultCache::new();
        cache.set("k", json!(1)).await.unwrap();
        cache.set("k", json!(2)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(json!(2)));
    }
}
