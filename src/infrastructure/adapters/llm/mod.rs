//! LLM 适配器

mod fake_llm_client;
mod http_llm_client;

pub use fake_llm_client::{FakeLlmClient, FakeLlmClientConfig};
pub use http_llm_client::{HttpLlmClient, HttpLlmClientConfig};
