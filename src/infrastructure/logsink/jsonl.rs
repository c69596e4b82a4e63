//! JSONL Request Log - 请求日志按行追加到 JSONL 文件
//!
//! 每条记录一行 JSON。写失败只打 warn，不影响请求本身。

use async_trait::async_trait;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::application::ports::{RequestLogEvent, RequestLogPort};

/// 落盘行格式
#[derive(Debug, Serialize)]
struct LogLine<'a> {
    id: Uuid,
    #[serde(flatten)]
    event: &'a RequestLogEvent,
}

/// JSONL 请求日志
pub struct JsonlRequestLog {
    path: PathBuf,
    // 串行化追加写，保证行不交错
    write_lock: Mutex<()>,
}

impl JsonlRequestLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }
}

#[async_trait]
impl RequestLogPort for JsonlRequestLog {
    async fn record(&self, event: RequestLogEvent) -> Option<Uuid> {
        let id = Uuid::new_v4();
        let line = match serde_json::to_string(&LogLine { id, event: &event }) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize request log event");
                return None;
            }
        };

        let _guard = self.write_lock.lock().await;
        match self.append_line(&line) {
            Ok(()) => {
                tracing::debug!(
                    record_id = %id,
                    outcome = event.outcome.as_str(),
                    "Request log recorded"
                );
                Some(id)
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to append request log");
                None
            }
        }
    }
}

/// 空实现，配置关闭请求日志时使用
pub struct NoopRequestLog;

#[async_trait]
impl RequestLogPort for NoopRequestLog {
    async fn record(&self, _event: RequestLogEvent) -> Option<Uuid> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::RequestOutcome;
    use chrono::Utc;

    fn sample_event(outcome: RequestOutcome) -> RequestLogEvent {
        RequestLogEvent {
            cache_key: "result:abc".to_string(),
            file_name: "talk.mp3".to_string(),
            mime_type: "audio/mpeg".to_string(),
            outcome,
            detail: None,
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_record_appends_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.jsonl");
        let log = JsonlRequestLog::new(&path);

        assert!(log.record(sample_event(RequestOutcome::Completed)).await.is_some());
        assert!(log.record(sample_event(RequestOutcome::Cached)).await.is_some());

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["outcome"], "completed");
        assert_eq!(first["file_name"], "talk.mp3");
        assert!(first["id"].is_string());

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["outcome"], "cached");
    }

    #[tokio::test]
    async fn test_record_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/nested/requests.jsonl");
        let log = JsonlRequestLog::new(&path);

        assert!(log.record(sample_event(RequestOutcome::Failed)).await.is_some());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_noop_returns_none() {
        let log = NoopRequestLog;
        assert!(log.record(sample_event(RequestOutcome::Cancelled)).await.is_none());
    }
}
