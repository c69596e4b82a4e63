//! STT 适配器

mod fake_stt_client;
mod http_stt_client;

pub use fake_stt_client::{FakeSttClient, FakeSttClientConfig};
pub use http_stt_client::{HttpSttClient, HttpSttClientConfig};
