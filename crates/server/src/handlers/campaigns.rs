//! # Campaign Handlers
//!
//! Campaign CRUD and per-campaign chat history. A campaign is indexed from its media
//! only, so writes that set or change media enqueue an indexing job.

use super::{wrap_response, ApiResponse, AppError, AppState, DebugParams};
use adintel::{
    types::{Campaign, CampaignInput, ChatMessage, MessageRole},
    IndexRequest,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

// --- API Payloads for Campaign Handlers ---

#[derive(Serialize, Deserialize, Debug)]
pub struct CampaignResponse {
    pub campaign: Campaign,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct NewMessage {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Deserialize, Debug)]
pub struct CreateMessagesRequest {
    #[serde(default)]
    pub messages: Vec<NewMessage>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct DeletedCampaignResponse {
    pub deleted: bool,
}

impl AppState {
    /// Queues the campaign for indexing when it carries media; returns the job id.
    async fn index_campaign(&self, campaign: &Campaign, replace: bool) -> Option<String> {
        campaign.media.as_ref()?;
        let request = IndexRequest::from_campaign(campaign);
        let queued = if replace {
            self.queue.reindex(request).await
        } else {
            self.queue.enqueue(request).await
        };
        match queued {
            Ok(job) => Some(job.id),
            Err(e) => {
                warn!(campaign_id = %campaign.id, "Failed to queue campaign indexing: {e}");
                None
            }
        }
    }
}

// --- Campaign Handlers ---

pub async fn list_campaigns_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<Vec<Campaign>>>, AppError> {
    let campaigns = app_state.sqlite_provider.list_campaigns().await?;
    Ok(wrap_response(campaigns, debug_params, None))
}

pub async fn create_campaign_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<CampaignInput>,
) -> Result<(StatusCode, Json<ApiResponse<CampaignResponse>>), AppError> {
    let campaign = app_state.sqlite_provider.create_campaign(&payload).await?;
    let job_id = app_state.index_campaign(&campaign, false).await;
    info!(campaign_id = %campaign.id, indexed = job_id.is_some(), "Created campaign");
    Ok((
        StatusCode::CREATED,
        wrap_response(CampaignResponse { campaign, job_id }, debug_params, None),
    ))
}

pub async fn get_campaign_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<Campaign>>, AppError> {
    let campaign = app_state
        .sqlite_provider
        .get_campaign(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Campaign '{id}' not found")))?;
    Ok(wrap_response(campaign, debug_params, None))
}

/// Replaces caption and media. New media replaces the campaign's vector document.
pub async fn update_campaign_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<CampaignInput>,
) -> Result<Json<ApiResponse<CampaignResponse>>, AppError> {
    let previous = app_state
        .sqlite_provider
        .get_campaign(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Campaign '{id}' not found")))?;
    let campaign = app_state
        .sqlite_provider
        .update_campaign(&id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Campaign '{id}' not found")))?;

    let media_changed = previous.media != campaign.media;
    let job_id = if media_changed {
        app_state.index_campaign(&campaign, true).await
    } else {
        None
    };
    let debug_info = json!({ "media_changed": media_changed });
    Ok(wrap_response(
        CampaignResponse { campaign, job_id },
        debug_params,
        Some(debug_info),
    ))
}

pub async fn delete_campaign_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<DeletedCampaignResponse>>, AppError> {
    let deleted = app_state.sqlite_provider.delete_campaign(&id).await?;
    if !deleted {
        return Err(AppError::NotFound(format!("Campaign '{id}' not found")));
    }
    if let Err(e) = app_state
        .vector_index
        .delete_document(app_state.collection(), &id)
        .await
    {
        warn!(campaign_id = %id, "Failed to remove vector document: {e}");
    }
    info!(campaign_id = %id, "Deleted campaign");
    Ok(wrap_response(
        DeletedCampaignResponse { deleted },
        debug_params,
        None,
    ))
}

// --- Chat History Handlers ---

pub async fn list_messages_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<Vec<ChatMessage>>>, AppError> {
    let messages = app_state.sqlite_provider.list_chat_messages(Some(&id)).await?;
    Ok(wrap_response(messages, debug_params, None))
}

pub async fn create_messages_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<CreateMessagesRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<ChatMessage>>>), AppError> {
    if payload.messages.is_empty() {
        return Err(AppError::BadRequest(
            "Missing required field: messages".to_string(),
        ));
    }
    if app_state.sqlite_provider.get_campaign(&id).await?.is_none() {
        return Err(AppError::NotFound(format!("Campaign '{id}' not found")));
    }
    let messages: Vec<(MessageRole, String)> = payload
        .messages
        .into_iter()
        .map(|m| (m.role, m.content))
        .collect();
    let created = app_state
        .sqlite_provider
        .create_chat_messages(Some(&id), &messages)
        .await?;
    Ok((
        StatusCode::CREATED,
        wrap_response(created, debug_params, None),
    ))
}
