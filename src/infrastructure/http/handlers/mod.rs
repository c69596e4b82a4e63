//! HTTP Handlers

mod cache;
mod ping;
mod process;

pub use cache::*;
pub use ping::*;
pub use process::*;
