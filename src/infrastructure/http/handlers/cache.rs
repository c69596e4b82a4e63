//! Cache HTTP Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::infrastructure::http::dto::{ApiResponse, CacheStatsResponse};
use crate::infrastructure::http::state::AppState;

/// 缓存统计
pub async fn cache_stats(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<CacheStatsResponse>> {
    let stats = state.cache.stats().await;

    Json(ApiResponse::success(CacheStatsResponse {
        total_entries: stats.total_entries,
        hit_count: stats.hit_count,
        miss_count: stats.miss_count,
    }))
}
