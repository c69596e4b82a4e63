//! Process HTTP Handler - 提交媒体处理请求
//!
//! multipart 请求进来，SSE 事件流出去。管线在独立 task 中运行；
//! SSE 流持有 CancellationToken 的 DropGuard，客户端断开即取消管线。
//!
//! Multipart 字段:
//! - file              媒体文件（与 media_url 二选一）
//! - media_url         远程媒体 URL（与 file 二选一）
//! - input_language    媒体语言，默认 "auto"
//! - output_language   产出语言，默认 "en"
//! - translate_target  翻译目标语言，可选，留空表示不翻译

use axum::extract::{Multipart, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::application::pipeline::PipelineRequest;
use crate::application::progress::{ProgressEvent, ProgressSink};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 进度通道容量；消费慢时发送端背压等待
const PROGRESS_CHANNEL_CAPACITY: usize = 256;

/// 提交媒体处理请求
pub async fn process_media(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let request = build_request(&state, multipart).await?;

    tracing::info!(
        file_name = %request.file_name,
        mime_type = %request.mime_type,
        media_size = request.media.len(),
        output_language = %request.output_language,
        translate_target = ?request.translate_target,
        "Accepted processing request"
    );

    let (sink, rx) = ProgressSink::channel(PROGRESS_CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        // 终态已通过事件流与请求日志对外传达
        let _ = pipeline.run(request, &sink, &cancel).await;
    });

    let stream = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let event = rx.recv().await?;
        Some((sse_event(&event), (rx, guard)))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// 解析 multipart 字段，必要时取回远程媒体
async fn build_request(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<PipelineRequest, ApiError> {
    let mut media: Option<Vec<u8>> = None;
    let mut mime_type: Option<String> = None;
    let mut file_name: Option<String> = None;
    let mut media_url: Option<String> = None;
    let mut input_language = "auto".to_string();
    let mut output_language = "en".to_string();
    let mut translate_target: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError::BadRequest(format!("Failed to read multipart field: {e}"))
    })? {
        let field_name = field.name().unwrap_or_default().to_string();

        match field_name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                mime_type = field.content_type().map(|s| s.to_string());
                media = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {e}")))?
                        .to_vec(),
                );
            }
            "media_url" => {
                media_url = Some(field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read media_url: {e}"))
                })?);
            }
            "input_language" => {
                let value = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read input_language: {e}"))
                })?;
                if !value.trim().is_empty() {
                    input_language = value.trim().to_string();
                }
            }
            "output_language" => {
                let value = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read output_language: {e}"))
                })?;
                if !value.trim().is_empty() {
                    output_language = value.trim().to_string();
                }
            }
            "translate_target" => {
                let value = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read translate_target: {e}"))
                })?;
                let value = value.trim().to_string();
                if !value.is_empty() {
                    translate_target = Some(value);
                }
            }
            _ => {}
        }
    }

    let (media, mime_type, file_name) = match (media, media_url) {
        (Some(bytes), _) => (
            bytes,
            mime_type.unwrap_or_else(|| "application/octet-stream".to_string()),
            file_name.unwrap_or_else(|| "upload".to_string()),
        ),
        (None, Some(url)) => {
            let fetched = state.fetcher.fetch(&url).await?;
            (fetched.bytes, fetched.mime_type, fetched.file_name)
        }
        (None, None) => {
            return Err(ApiError::BadRequest(
                "Either file or media_url is required".to_string(),
            ))
        }
    };

    Ok(PipelineRequest {
        media,
        mime_type,
        file_name,
        input_language,
        output_language,
        translate_target,
    })
}

/// 进度事件转 SSE：事件名进 event 字段，内容进 data 字段
fn sse_event(event: &ProgressEvent) -> Result<Event, axum::Error> {
    let value = serde_json::to_value(event).map_err(axum::Error::new)?;
    let data = value
        .get("data")
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    Event::default().event(event.name()).json_data(data)
}
