//! # Chat Handler
//!
//! Answers a conversation as a UI message stream: server-sent events whose `data`
//! lines carry JSON chunks (`start`, `text-start`, `text-delta`, `text-end`, ...,
//! `finish`) followed by a final `[DONE]`.

use super::{AppError, AppState};
use adintel::chat::{ChatReply, UiMessage, UPDATE_CAMPAIGN_TOOL};
use axum::{
    extract::State,
    response::sse::{Event, Sse},
    Json,
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

const ANALYSIS_FOOTER: &str = "\n\n📡 Powered by BrightData SERP research.";

#[derive(Deserialize, Debug)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<UiMessage>,
}

fn text_chunks(message_id: &str, metadata: Option<Value>, text: &str) -> Vec<Value> {
    let text_id = format!("{message_id}-text");
    let mut start = json!({ "type": "start", "messageId": message_id });
    if let Some(metadata) = metadata {
        start["messageMetadata"] = metadata;
    }
    vec![
        start,
        json!({ "type": "text-start", "id": text_id }),
        json!({ "type": "text-delta", "id": text_id, "delta": text }),
        json!({ "type": "text-end", "id": text_id }),
    ]
}

/// Lays a reply out as the ordered stream chunks the chat client renders.
pub fn reply_chunks(reply: ChatReply) -> Vec<Value> {
    let message_id = Uuid::new_v4().to_string();
    let mut chunks = match reply {
        ChatReply::Immediate(text) => text_chunks(&message_id, None, &text),
        ChatReply::Analysis(event) => {
            let metadata = json!({ "kind": "brightdata-analysis", "query": event.query });
            let text = match &event.error {
                Some(error) => format!("\n\n⚠️ BrightData tool call failed: {error}."),
                None => ANALYSIS_FOOTER.to_string(),
            };
            let mut chunks = text_chunks(&message_id, Some(metadata), &text);
            chunks.push(json!({
                "type": "data-competitor-analysis",
                "id": message_id,
                "data": event,
            }));
            chunks
        }
        ChatReply::Model {
            text,
            update_proposal,
            social_action,
        } => {
            let mut chunks = text_chunks(&message_id, None, &text);
            if let Some(update) = update_proposal {
                chunks.push(json!({
                    "type": "tool-approval-request",
                    "toolName": UPDATE_CAMPAIGN_TOOL,
                    "parameters": update,
                }));
            }
            if let Some(action) = social_action {
                chunks.push(json!({ "type": "social-action", "data": action }));
            }
            chunks
        }
    };
    chunks.push(json!({ "type": "finish" }));
    chunks
}

pub async fn chat_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    if payload.messages.is_empty() {
        return Err(AppError::BadRequest(
            "Missing required field: messages".to_string(),
        ));
    }
    info!(messages = payload.messages.len(), "Received chat request");

    let reply = app_state.chat.respond(&payload.messages).await?;
    let events = reply_chunks(reply)
        .into_iter()
        .map(|chunk| Event::default().json_data(chunk))
        .chain(std::iter::once(Ok(Event::default().data("[DONE]"))));

    Ok(Sse::new(stream::iter(events)))
}
