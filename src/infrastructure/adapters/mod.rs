//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod fetch;
pub mod llm;
pub mod stt;

pub use fetch::*;
pub use llm::*;
pub use stt::*;
