//! # Integration Handlers
//!
//! Social posting through Composio and web research through BrightData.

use super::{required, wrap_response, ApiResponse, AppError, AppState, DebugParams};
use adintel::{
    social::{ActionResult, ConnectedAccounts, SocialAction, POST_TO_SOCIAL},
    web::{ScrapeOptions, ScrapedPage, SearchResults, DEFAULT_MAX_RESULTS},
};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

// --- API Payloads for Integration Handlers ---

#[derive(Deserialize, Debug, Default)]
pub struct AccountsParams {
    #[serde(alias = "userId")]
    pub user_id: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct SocialActionRequest {
    #[serde(default)]
    pub action: Option<Value>,
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WebSearchRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub max_results: Option<u32>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WebScrapeRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub include_links: Option<bool>,
    #[serde(default)]
    pub include_images: Option<bool>,
}

/// Checks the action shape before it reaches Composio.
fn parse_social_action(action: Value) -> Result<SocialAction, AppError> {
    let invalid = || AppError::BadRequest("Invalid action structure".to_string());
    let field = |name: &str| action.get(name).and_then(Value::as_str).unwrap_or_default();
    if field("type") != POST_TO_SOCIAL || field("platform").is_empty() || field("content").is_empty()
    {
        return Err(invalid());
    }
    serde_json::from_value(action).map_err(|_| invalid())
}

// --- Social Handlers ---

pub async fn social_accounts_handler(
    State(app_state): State<AppState>,
    Query(params): Query<AccountsParams>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<ConnectedAccounts>>, AppError> {
    let user_id = required(params.user_id.as_deref(), "user_id")?;
    let accounts = app_state.social.check_connected_accounts(user_id).await;
    Ok(wrap_response(accounts, debug_params, None))
}

/// Executes an approved post. Platform failures come back as `{success: false}`.
pub async fn social_action_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<SocialActionRequest>,
) -> Result<Json<ApiResponse<ActionResult>>, AppError> {
    let user_id = required(payload.user_id.as_deref(), "user_id")?;
    let action = payload
        .action
        .ok_or_else(|| AppError::BadRequest("Missing required field: action".to_string()))?;
    let action = parse_social_action(action)?;

    info!(platform = %action.platform, "Executing social action");
    let result = app_state
        .social
        .execute_social_action(&action, user_id)
        .await;
    let debug_info = json!({ "platform": action.platform });
    Ok(wrap_response(result, debug_params, Some(debug_info)))
}

// --- Web Research Handlers ---

pub async fn web_search_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<WebSearchRequest>,
) -> Result<Json<ApiResponse<SearchResults>>, AppError> {
    let query = required(payload.query.as_deref(), "query")?;
    let max_results = payload.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
    let results = app_state.web.search(query, max_results).await?;
    Ok(wrap_response(results, debug_params, None))
}

pub async fn web_scrape_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<WebScrapeRequest>,
) -> Result<Json<ApiResponse<ScrapedPage>>, AppError> {
    let url = required(payload.url.as_deref(), "url")?;
    let defaults = ScrapeOptions::default();
    let options = ScrapeOptions {
        include_links: payload.include_links.unwrap_or(defaults.include_links),
        include_images: payload.include_images.unwrap_or(defaults.include_images),
    };
    let page = app_state.web.scrape(url, options).await?;
    Ok(wrap_response(page, debug_params, None))
}
