//! # Vector Collection Handlers
//!
//! CRUD over named vector collections plus document insert and similarity query.

use super::{required, wrap_response, ApiResponse, AppError, AppState, DebugParams};
use adintel::providers::vector::{
    AddResult, CollectionInfo, NewDocument, QueryResult, StoredDocument,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

const DEFAULT_N_RESULTS: usize = 5;

// --- API Payloads for Collection Handlers ---

#[derive(Deserialize, Debug)]
pub struct CreateCollectionRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Deserialize, Debug)]
pub struct AddDocumentsRequest {
    #[serde(default)]
    pub documents: Vec<NewDocument>,
}

#[derive(Deserialize, Debug)]
pub struct QueryCollectionRequest {
    #[serde(default)]
    pub query_texts: Vec<String>,
    #[serde(default)]
    pub n_results: Option<usize>,
    /// Flat metadata equality filter.
    #[serde(default, rename = "where")]
    pub filter: Option<Map<String, Value>>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct DeletedResponse {
    pub deleted: bool,
}

// --- Collection Handlers ---

pub async fn list_collections_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<Vec<CollectionInfo>>>, AppError> {
    let collections = app_state.vector_index.list_collections().await?;
    let debug_info = json!({ "count": collections.len() });
    Ok(wrap_response(collections, debug_params, Some(debug_info)))
}

pub async fn create_collection_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<CreateCollectionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CollectionInfo>>), AppError> {
    let name = required(payload.name.as_deref(), "name")?;
    info!(collection = %name, "Creating collection");
    let collection = app_state
        .vector_index
        .create_collection(name, payload.metadata)
        .await?;
    Ok((
        StatusCode::CREATED,
        wrap_response(collection, debug_params, None),
    ))
}

pub async fn get_collection_handler(
    State(app_state): State<AppState>,
    Path(name): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<CollectionInfo>>, AppError> {
    let collection = app_state
        .vector_index
        .get_collection(&name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Collection '{name}' not found")))?;
    Ok(wrap_response(collection, debug_params, None))
}

pub async fn delete_collection_handler(
    State(app_state): State<AppState>,
    Path(name): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<DeletedResponse>>, AppError> {
    let deleted = app_state.vector_index.delete_collection(&name).await?;
    if !deleted {
        return Err(AppError::NotFound(format!("Collection '{name}' not found")));
    }
    info!(collection = %name, "Deleted collection");
    Ok(wrap_response(DeletedResponse { deleted }, debug_params, None))
}

pub async fn list_documents_handler(
    State(app_state): State<AppState>,
    Path(name): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<Vec<StoredDocument>>>, AppError> {
    let documents = app_state.vector_index.get_documents(&name).await?;
    Ok(wrap_response(documents, debug_params, None))
}

/// Inserts documents, counting ids already present as skipped instead of failing.
pub async fn add_documents_handler(
    State(app_state): State<AppState>,
    Path(name): Path<String>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<AddDocumentsRequest>,
) -> Result<Json<ApiResponse<AddResult>>, AppError> {
    if payload.documents.is_empty() {
        return Err(AppError::BadRequest(
            "Missing required field: documents".to_string(),
        ));
    }
    let submitted = payload.documents.len();
    let result = app_state
        .vector_index
        .add_documents(&name, payload.documents)
        .await?;
    info!(
        collection = %name,
        added = result.added,
        skipped = result.skipped,
        "Added documents"
    );
    let debug_info = json!({ "submitted": submitted });
    Ok(wrap_response(result, debug_params, Some(debug_info)))
}

pub async fn query_collection_handler(
    State(app_state): State<AppState>,
    Path(name): Path<String>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<QueryCollectionRequest>,
) -> Result<Json<ApiResponse<Vec<QueryResult>>>, AppError> {
    if payload.query_texts.is_empty() {
        return Err(AppError::BadRequest(
            "Missing required field: query_texts".to_string(),
        ));
    }
    let n_results = payload.n_results.unwrap_or(DEFAULT_N_RESULTS);
    let results = app_state
        .vector_index
        .query(&name, &payload.query_texts, n_results, payload.filter.as_ref())
        .await?;
    let debug_info = json!({
        "n_results": n_results,
        "where": payload.filter,
    });
    Ok(wrap_response(results, debug_params, Some(debug_info)))
}
