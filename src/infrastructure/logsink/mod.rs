//! 请求日志落盘

mod jsonl;

pub use jsonl::{JsonlRequestLog, NoopRequestLog};
