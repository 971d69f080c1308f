//! # Content Library & Indexing Handlers
//!
//! Content-item CRUD plus the endpoints that feed the indexing queue. Every write that
//! needs captioning or indexing answers right away; the work itself is a durable job
//! whose progress is visible under `/index/jobs`.

use super::{
    required, wrap_response, AcceptedResponse, ApiResponse, AppError, AppState, DebugParams,
};
use adintel::{
    indexing::ProcessReport,
    types::{Category, ContentItem, ContentType, MediaType, NewContentItem},
    IndexJob, IndexRequest, JobStatus,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

const DEFAULT_JOB_LIMIT: u32 = 50;

// --- API Payloads for Content Handlers ---

#[derive(Deserialize, Debug, Default)]
pub struct ContentListParams {
    pub category: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct CreateContentItemRequest {
    #[serde(default, rename = "type")]
    pub content_type: Option<ContentType>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, alias = "summary")]
    pub text: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CreatedContentItem {
    pub item: ContentItem,
    pub job_id: String,
}

/// The loosely-typed item description accepted by `/content/index` and `/content/process`.
#[derive(Deserialize, Debug, Default)]
pub struct IndexContentRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub content_type: Option<ContentType>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Only read for campaigns; inferred from the url extension when absent.
    #[serde(default, alias = "mediaType")]
    pub media_type: Option<MediaType>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
}

impl IndexContentRequest {
    fn caption_media_type(&self, content_type: ContentType) -> Option<MediaType> {
        match content_type {
            ContentType::Campaign => self
                .media_type
                .or_else(|| self.url.as_deref().and_then(MediaType::from_url)),
            other => other.media_type(),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct JobListParams {
    pub status: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct DeletedItemResponse {
    pub deleted: bool,
    /// Whether a vector document was removed along with the item.
    pub unindexed: bool,
}

fn accepted(job: &IndexJob) -> (StatusCode, Json<AcceptedResponse>) {
    (
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            accepted: true,
            job_id: job.id.clone(),
            item_id: job.item_id.clone(),
        }),
    )
}

// --- Content Item Handlers ---

pub async fn list_content_items_handler(
    State(app_state): State<AppState>,
    Query(params): Query<ContentListParams>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<Vec<ContentItem>>>, AppError> {
    let category = params
        .category
        .as_deref()
        .map(str::parse::<Category>)
        .transpose()
        .map_err(AppError::BadRequest)?;
    let items = app_state.sqlite_provider.list_content_items(category).await?;
    let debug_info = json!({ "category": category, "count": items.len() });
    Ok(wrap_response(items, debug_params, Some(debug_info)))
}

/// Stores a new item and enqueues it for captioning and indexing.
pub async fn create_content_item_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<CreateContentItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedContentItem>>), AppError> {
    let name = required(payload.name.as_deref(), "name")?;
    let content_type = payload
        .content_type
        .ok_or_else(|| AppError::BadRequest("Missing required field: type".to_string()))?;
    if content_type.is_media() {
        required(payload.url.as_deref(), "url")?;
    }

    let new_item = NewContentItem {
        content_type,
        name: name.to_string(),
        url: payload.url.clone(),
        thumbnail: payload.thumbnail.clone(),
        text: payload.text.clone(),
    };
    let category = payload.category.unwrap_or(Category::ContentLibrary);
    let item = app_state
        .sqlite_provider
        .create_content_item(&new_item, category)
        .await?;
    let job = app_state
        .queue
        .enqueue(IndexRequest::from_content_item(&item))
        .await?;
    info!(item_id = %item.id, job_id = %job.id, "Created content item");

    Ok((
        StatusCode::CREATED,
        wrap_response(
            CreatedContentItem {
                item,
                job_id: job.id,
            },
            debug_params,
            None,
        ),
    ))
}

pub async fn get_content_item_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<ContentItem>>, AppError> {
    let item = app_state
        .sqlite_provider
        .get_content_item(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Content item '{id}' not found")))?;
    Ok(wrap_response(item, debug_params, None))
}

/// Deletes the item, then removes its vector document. The removal is best effort.
pub async fn delete_content_item_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<DeletedItemResponse>>, AppError> {
    let item = app_state
        .sqlite_provider
        .get_content_item(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Content item '{id}' not found")))?;
    let deleted = app_state.sqlite_provider.delete_content_item(&id).await?;
    if !deleted {
        return Err(AppError::NotFound(format!("Content item '{id}' not found")));
    }
    let unindexed = match app_state
        .vector_index
        .delete_document(app_state.collection(), &id)
        .await
    {
        Ok(removed) => removed,
        Err(e) => {
            warn!(item_id = %id, "Failed to remove vector document: {e}");
            false
        }
    };

    // Uploaded media goes with the item; links to other hosts are left alone.
    let mut media_removed = false;
    if let Some(url) = item.url.as_deref().filter(|u| app_state.media_store.manages(u)) {
        match app_state.media_store.delete(url, None).await {
            Ok(()) => media_removed = true,
            Err(e) => warn!(item_id = %id, "Failed to remove stored media: {e}"),
        }
    }
    info!(item_id = %id, unindexed, media_removed, "Deleted content item");
    Ok(wrap_response(
        DeletedItemResponse { deleted, unindexed },
        debug_params,
        Some(json!({ "media_removed": media_removed })),
    ))
}

/// Re-runs indexing for a stored item, replacing its current vector document.
pub async fn reindex_content_item_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<AcceptedResponse>), AppError> {
    let item = app_state
        .sqlite_provider
        .get_content_item(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Content item '{id}' not found")))?;
    let job = app_state
        .queue
        .reindex(IndexRequest::from_content_item(&item))
        .await?;
    Ok(accepted(&job))
}

// --- Indexing Handlers ---

/// Accepts an item description and guarantees it eventually reaches the vector index.
pub async fn index_content_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<IndexContentRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), AppError> {
    let id = required(payload.id.as_deref(), "id")?;
    let name = required(payload.name.as_deref(), "name")?;
    let content_type = payload
        .content_type
        .ok_or_else(|| AppError::BadRequest("Missing required field: type".to_string()))?;

    let request = IndexRequest {
        id: id.to_string(),
        content_type,
        name: name.to_string(),
        url: payload.url.clone(),
        media_type: payload.caption_media_type(content_type),
        caption: payload.caption.clone(),
        summary: payload.summary.clone(),
        category: payload.category,
    };
    let job = app_state.queue.enqueue(request).await?;
    Ok(accepted(&job))
}

/// Persists a ready summary and indexes it before responding. Never captions.
pub async fn process_content_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<IndexContentRequest>,
) -> Result<Json<ApiResponse<ProcessReport>>, AppError> {
    let id = required(payload.id.as_deref(), "id")?;
    let stored = app_state.sqlite_provider.get_content_item(id).await?;

    let mut request = match &stored {
        Some(item) => IndexRequest::from_content_item(item),
        None => IndexRequest {
            id: id.to_string(),
            content_type: ContentType::Text,
            name: String::new(),
            url: None,
            media_type: None,
            caption: None,
            summary: None,
            category: None,
        },
    };
    if let Some(content_type) = payload.content_type {
        request.content_type = content_type;
    }
    request.media_type = payload
        .caption_media_type(request.content_type)
        .or(request.media_type);
    if let Some(name) = payload.name {
        request.name = name;
    }
    if payload.url.is_some() {
        request.url = payload.url;
    }
    if payload.summary.is_some() {
        request.summary = payload.summary;
    }
    if payload.category.is_some() {
        request.category = payload.category;
    }

    let report = app_state.pipeline().process_content(&request).await?;
    let debug_info = json!({ "stored_item": stored.is_some() });
    Ok(wrap_response(report, debug_params, Some(debug_info)))
}

// --- Job Handlers ---

pub async fn list_jobs_handler(
    State(app_state): State<AppState>,
    Query(params): Query<JobListParams>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<Vec<IndexJob>>>, AppError> {
    let status = params
        .status
        .as_deref()
        .map(str::parse::<JobStatus>)
        .transpose()
        .map_err(AppError::BadRequest)?;
    let jobs = app_state
        .queue
        .jobs()
        .list(status, params.limit.unwrap_or(DEFAULT_JOB_LIMIT))
        .await?;
    Ok(wrap_response(jobs, debug_params, None))
}

pub async fn get_job_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<IndexJob>>, AppError> {
    let job = app_state
        .queue
        .jobs()
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Index job '{id}' not found")))?;
    Ok(wrap_response(job, debug_params, None))
}
