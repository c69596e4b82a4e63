//! Application State

use std::sync::Arc;

use crate::application::pipeline::PipelineOrchestrator;
use crate::application::ports::ResultCachePort;
use crate::infrastructure::adapters::RemoteMediaFetcher;

/// 应用状态
pub struct AppState {
    pub pipeline: Arc<PipelineOrchestrator>,
    pub cache: Arc<dyn ResultCachePort>,
    pub fetcher: Arc<RemoteMediaFetcher>,
}

impl AppState {
    pub fn new(
        pipeline: Arc<PipelineOrchestrator>,
        cache: Arc<dyn ResultCachePort>,
        fetcher: Arc<RemoteMediaFetcher>,
    ) -> Self {
        Self {
            pipeline,
            cache,
            fetcher,
        }
    }
}
