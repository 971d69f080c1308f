use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize, Default)]
pub struct DebugParams {
    pub debug: Option<bool>,
}

#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Value>,
    pub result: T,
}

/// The 202 body returned whenever work is handed to the indexing queue.
#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptedResponse {
    pub accepted: bool,
    pub job_id: String,
    pub item_id: String,
}
