//! Sled-based Result Cache Implementation
//!
//! 跨进程重启保留的 TTL 缓存后端。条目以 bincode 存储，payload 本身
//! 序列化为 JSON 字符串；过期语义与内存实现一致（读时惰性删除）。

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sled::Db;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::application::ports::{CacheError, CacheStats, ResultCachePort};
use crate::infrastructure::persistence::memory::DEFAULT_TTL_SECS;

/// Sled 缓存配置
#[derive(Debug, Clone)]
pub struct SledResultCacheConfig {
    /// 数据库路径
    pub db_path: String,
    /// 条目存活时间（秒）
    pub ttl_secs: u64,
}

impl Default for SledResultCacheConfig {
    fn default() -> Self {
        Self {
            db_path: "data/cache.sled".to_string(),
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

/// 内部持久化条目
#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    /// JSON 编码的缓存值
    json: String,
    /// 写入时刻（毫秒时间戳）
    stored_at_ms: i64,
}

/// Sled 结果缓存
pub struct SledResultCache {
    db: Db,
    ttl_ms: i64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl SledResultCache {
    /// 创建新的缓存实例
    pub fn new(config: &SledResultCacheConfig) -> Result<Self, CacheError> {
        let db = sled::open(&config.db_path)
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?;

        tracing::info!(
            db_path = %config.db_path,
            ttl_secs = config.ttl_secs,
            entries = db.len(),
            "SledResultCache initialized"
        );

        Ok(Self {
            db,
            ttl_ms: (config.ttl_secs as i64).saturating_mul(1000),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        })
    }

    /// 打开现有缓存
    pub fn open<P: AsRef<Path>>(path: P, ttl_secs: u64) -> Result<Self, CacheError> {
        let config = SledResultCacheConfig {
            db_path: path.as_ref().to_string_lossy().to_string(),
            ttl_secs,
        };
        Self::new(&config)
    }

    /// 刷新数据库
    pub fn flush(&self) -> Result<(), CacheError> {
        self.db
            .flush()
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ResultCachePort for SledResultCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        match self.db.get(key) {
            Ok(Some(raw)) => {
                let entry: PersistedEntry = bincode::deserialize(&raw)
                    .map_err(|e| CacheError::SerializationError(e.to_string()))?;

                if Utc::now().timestamp_millis() - entry.stored_at_ms > self.ttl_ms {
                    // 惰性删除
                    self.db
                        .remove(key)
                        .map_err(|e| CacheError::DatabaseError(e.to_string()))?;
                    self.miss_count.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(key = %key, "Cache entry expired, evicted");
                    return Ok(None);
                }

                let value: Value = serde_json::from_str(&entry.json)
                    .map_err(|e| CacheError::SerializationError(e.to_string()))?;
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Ok(Some(value))
            }
            Ok(None) => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Err(e) => Err(CacheError::DatabaseError(e.to_string())),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), CacheError> {
        let entry = PersistedEntry {
            json: value.to_string(),
            stored_at_ms: Utc::now().timestamp_millis(),
        };
        let raw = bincode::serialize(&entry)
            .map_err(|e| CacheError::SerializationError(e.to_string()))?;

        self.db
            .insert(key, raw)
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?;

        tracing::debug!(key = %key, "Result cached");
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.db.len(),
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn open_cache(dir: &tempfile::TempDir, ttl_secs: u64) -> SledResultCache {
        SledResultCache::open(dir.path().join("test.sled"), ttl_secs).unwrap()
    }

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let dir = tempdir().unwrap();
        let cache = open_cache(&dir, 3600);

        cache.set("result:abc", json!({"summary": "s"})).await.unwrap();

        let value = cache.get("result:abc").await.unwrap();
        assert_eq!(value, Some(json!({"summary": "s"})));

        let stats = cache.stats().await;
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.hit_count, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_evicted_on_read() {
        let dir = tempdir().unwrap();
        let cache = open_cache(&dir, 0);

        cache.set("k", json!("v")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert_eq!(cache.get("k").await.unwrap(), None);
        assert_eq!(cache.stats().await.total_entries, 0);
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let cache = open_cache(&dir, 3600);
            cache.set("k", json!(42)).await.unwrap();
            cache.flush().unwrap();
        }

        let cache = open_cache(&dir, 3600);
        assert_eq!(cache.get("k").await.unwrap(), Some(json!(42)));
    }
}
