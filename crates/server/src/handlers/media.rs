//! # Media Handlers
//!
//! Background media analysis, binary uploads to the media store and social video
//! link resolution.

use super::{
    required, wrap_response, AcceptedResponse, ApiResponse, AppError, AppState, DebugParams,
};
use adintel::{
    download::ResolvedVideo,
    types::{Category, ContentType, MediaType},
    IndexRequest,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Multipart;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

// --- API Payloads for Media Handlers ---

#[derive(Deserialize, Debug)]
pub struct AnalyzeMediaRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "type")]
    pub media_type: Option<MediaType>,
    #[serde(default)]
    pub name: Option<String>,
    /// The content item the caption belongs to. A fresh id is used when absent.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UploadResponse {
    pub url: String,
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Deserialize, Debug)]
pub struct DownloadRequest {
    #[serde(default)]
    pub url: Option<String>,
}

// --- Media Handlers ---

/// Validates the request and queues captioning; the caption lands on the item and in
/// the vector index once the job completes.
pub async fn analyze_media_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<AnalyzeMediaRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), AppError> {
    let url = required(payload.url.as_deref(), "url")?;
    let media_type = payload
        .media_type
        .ok_or_else(|| AppError::BadRequest("Missing required field: type".to_string()))?;
    url::Url::parse(url).map_err(|e| AppError::BadRequest(format!("Invalid media URL: {e}")))?;

    let id = payload
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let content_type = match media_type {
        MediaType::Image => ContentType::Image,
        MediaType::Video => ContentType::Video,
    };
    let name = payload
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| url.rsplit('/').next().unwrap_or(url).to_string());

    let request = IndexRequest {
        id,
        content_type,
        name,
        url: Some(url.to_string()),
        media_type: Some(media_type),
        caption: None,
        summary: None,
        category: payload.category,
    };
    let job = app_state.queue.enqueue(request).await?;
    info!(job_id = %job.id, item_id = %job.item_id, "Accepted media analysis");

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            accepted: true,
            job_id: job.id,
            item_id: job.item_id,
        }),
    ))
}

/// Stores a multipart `file` part in the media store and returns its public URL.
pub async fn upload_media_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadResponse>>, AppError> {
    let mut file: Option<(Vec<u8>, String, String)> = None;
    let mut bucket: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(anyhow::Error::from)? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload.bin").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(anyhow::Error::from)?.to_vec();
                file = Some((bytes, file_name, content_type));
            }
            "bucket" => {
                let value = field.text().await.map_err(anyhow::Error::from)?;
                bucket = Some(value).filter(|b| !b.trim().is_empty());
            }
            _ => warn!("Ignoring unknown multipart field: {}", name),
        }
    }

    let (bytes, file_name, content_type) =
        file.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;
    if bytes.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }
    let size = bytes.len();

    let url = app_state
        .media_store
        .upload(bytes, &file_name, &content_type, bucket.as_deref())
        .await?;
    info!(%file_name, size, "Uploaded media");

    let debug_info = json!({ "bucket": bucket });
    Ok(wrap_response(
        UploadResponse {
            url,
            file_name,
            content_type,
            size,
        },
        debug_params,
        Some(debug_info),
    ))
}

/// Resolves a TikTok link to a direct video URL. Instagram and other hosts are rejected.
pub async fn download_media_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<DownloadRequest>,
) -> Result<Json<ApiResponse<ResolvedVideo>>, AppError> {
    let url = payload.url.unwrap_or_default();
    let video = app_state.downloader.resolve_video_link(&url).await?;
    Ok(wrap_response(video, debug_params, None))
}
