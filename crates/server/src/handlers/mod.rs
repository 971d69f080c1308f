//! # API Route Handlers
//!
//! This module organizes all the Axum route handlers for the `adintel-server`.
//! The handlers are split into logical sub-modules based on their functionality
//! (e.g., `collections`, `content`, `chat`).

// Sub-modules for different handler categories.
pub mod campaigns;
pub mod chat;
pub mod collections;
pub mod content;
pub mod general;
pub mod integrations;
pub mod media;

// Re-export all handlers from the sub-modules to make them easily accessible
// to the router under a single `handlers::` path.
pub use campaigns::*;
pub use chat::*;
pub use collections::*;
pub use content::*;
pub use general::*;
pub use integrations::*;
pub use media::*;

// Shared items used by multiple handler modules.
use super::{
    errors::AppError,
    state::AppState,
    types::{AcceptedResponse, ApiResponse, DebugParams},
};
use axum::{extract::Query, Json};
use serde_json::Value;

/// A shared helper function to wrap a successful result in the standard `ApiResponse`
/// format, optionally including debug information if requested.
pub(crate) fn wrap_response<T>(
    result: T,
    debug_params: Query<DebugParams>,
    debug_info: Option<Value>,
) -> Json<ApiResponse<T>> {
    let debug = if debug_params.debug.unwrap_or(false) {
        debug_info
    } else {
        None
    };
    Json(ApiResponse { debug, result })
}

/// Returns the trimmed value, or a `BadRequest` naming the missing field.
pub(crate) fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, AppError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("Missing required field: {field}")))
}
