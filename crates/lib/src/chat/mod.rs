//! # Conversational Assistant
//!
//! Turns a client conversation into one of three replies: an immediate message (the
//! campaign-update approval gate), a competitor analysis (`!analysis <query>`), or a
//! model answer with any update or posting proposals pulled out of it.

pub mod directives;
pub mod models;

pub use models::{ChatModels, HostedModels, ModelChoice, ModelHost};

use crate::{
    errors::ProviderError,
    indexing::{IndexQueue, IndexRequest},
    prompts::assistant::{campaign_context_section, MARKETING_ASSISTANT_SYSTEM_PROMPT},
    providers::{ai::ChatTurn, db::sqlite::SqliteProvider},
    research::{CompetitorAnalysisEvent, CompetitorResearch},
    social::SocialAction,
    types::{CampaignInput, CampaignMedia, MediaType},
};
use directives::{take_directive, METADATA, SOCIAL_ACTION, TOOL_APPROVAL, UPDATE_CAMPAIGN};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

pub const ANALYSIS_TRIGGER: &str = "!analysis";
pub const UPDATE_CAMPAIGN_TOOL: &str = "updateCampaign";

pub const NO_CAMPAIGN_CONTEXT: &str = "⚠️ Unable to update campaign: no active campaign context.";
pub const UPDATE_FAILED: &str =
    "⚠️ Failed to update the campaign after approval. Please try again.";
pub const UPDATE_CANCELLED: &str = "🚫 Campaign update cancelled per your decision.";
pub const UPDATE_SUCCEEDED: &str = "✅ Campaign updated successfully.";

/// A message as the chat client sends it: a role and a list of typed parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: String,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePart {
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl UiMessage {
    pub fn new(role: &str, text: impl Into<String>) -> Self {
        Self {
            id: None,
            role: role.to_string(),
            parts: vec![MessagePart {
                part_type: "text".to_string(),
                text: Some(text.into()),
            }],
        }
    }

    /// The concatenated text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter(|p| p.part_type == "text")
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// The campaign being edited, as the client last saw it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignContext {
    pub id: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub media: Option<CampaignMedia>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMetadata {
    #[serde(default)]
    pub campaign_context: Option<CampaignContext>,
    #[serde(default)]
    pub model: Option<String>,
}

/// The user's decision on a proposed tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolApproval {
    pub approved: bool,
    pub tool_name: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// Changes the assistant proposes for the active campaign.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_name: Option<String>,
}

impl CampaignUpdate {
    /// Reads approval parameters leniently: fields of the wrong type are ignored.
    pub fn from_parameters(parameters: &Map<String, Value>) -> Self {
        let string = |key: &str| parameters.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            caption: string("caption"),
            media_type: string("mediaType").and_then(|t| t.parse().ok()),
            media_url: string("mediaUrl"),
            media_name: string("mediaName"),
        }
    }

    fn new_media(&self) -> Option<CampaignMedia> {
        Some(CampaignMedia {
            media_type: self.media_type?,
            url: self.media_url.clone().filter(|u| !u.is_empty())?,
            name: self.media_name.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatReply {
    /// A fixed reply produced without calling a model.
    Immediate(String),
    Analysis(CompetitorAnalysisEvent),
    Model {
        text: String,
        update_proposal: Option<CampaignUpdate>,
        social_action: Option<SocialAction>,
    },
}

/// The query of an `!analysis` request in the last user message, if it is one.
pub fn analysis_query(messages: &[UiMessage]) -> Option<String> {
    let last_user = messages.iter().rev().find(|m| m.role == "user")?;
    let text = last_user.text();
    let text = text.trim();
    let lowered = text.to_lowercase();
    if !lowered.starts_with(ANALYSIS_TRIGGER) {
        return None;
    }
    let rest = text
        .get(ANALYSIS_TRIGGER.len()..)
        .map(str::trim)
        .unwrap_or_default();
    let query = if rest.is_empty() { text } else { rest };
    Some(query.to_string())
}

/// Builds the confirmation shown after an approved update.
pub fn confirmation_message(update: &CampaignUpdate) -> String {
    let mut lines = vec![UPDATE_SUCCEEDED.to_string()];
    if let Some(caption) = &update.caption {
        let quoted = caption
            .split('\n')
            .map(|line| format!("> {line}"))
            .collect::<Vec<_>>()
            .join("\n");
        lines.push(format!("**New caption:**\n{quoted}"));
    }
    if let Some(media) = update.new_media() {
        lines.push(format!("**Media updated:** {} • {}", media.media_type, media.url));
    }
    lines.join("\n\n")
}

pub fn system_prompt(context: Option<&CampaignContext>) -> String {
    let mut prompt = MARKETING_ASSISTANT_SYSTEM_PROMPT.to_string();
    if let Some(context) = context {
        prompt.push_str(&campaign_context_section(
            &context.id,
            &context.caption,
            context.media.as_ref(),
        ));
    }
    prompt
}

struct PreparedConversation {
    turns: Vec<ChatTurn>,
    metadata: ChatMetadata,
    approval: Option<ToolApproval>,
}

fn prepare(messages: &[UiMessage]) -> PreparedConversation {
    let last_user_idx = messages.iter().rposition(|m| m.role == "user");
    let mut metadata = ChatMetadata::default();
    let mut approval = None;
    let mut turns = Vec::with_capacity(messages.len());

    for (idx, message) in messages.iter().enumerate() {
        let mut text = message.text();
        if Some(idx) == last_user_idx {
            let (parsed_approval, rest) = take_directive::<ToolApproval>(&text, TOOL_APPROVAL);
            let (parsed_metadata, rest) = take_directive::<ChatMetadata>(&rest, METADATA);
            approval = parsed_approval;
            metadata = parsed_metadata.unwrap_or_default();
            text = rest;
        }
        if text.trim().is_empty() {
            continue;
        }
        match message.role.as_str() {
            "user" => turns.push(ChatTurn::user(text)),
            "assistant" => turns.push(ChatTurn::assistant(text)),
            _ => {}
        }
    }

    PreparedConversation {
        turns,
        metadata,
        approval,
    }
}

#[derive(Clone, Debug)]
pub struct ChatAssistant {
    models: Box<dyn ChatModels>,
    store: SqliteProvider,
    queue: IndexQueue,
    research: CompetitorResearch,
}

impl ChatAssistant {
    pub fn new(
        models: Box<dyn ChatModels>,
        store: SqliteProvider,
        queue: IndexQueue,
        research: CompetitorResearch,
    ) -> Self {
        Self {
            models,
            store,
            queue,
            research,
        }
    }

    pub async fn respond(&self, messages: &[UiMessage]) -> Result<ChatReply, ProviderError> {
        if let Some(query) = analysis_query(messages) {
            info!(%query, "Running competitor analysis");
            return Ok(ChatReply::Analysis(self.research.analysis_event(&query).await));
        }

        let PreparedConversation {
            turns,
            metadata,
            approval,
        } = prepare(messages);
        let context = metadata.campaign_context;

        if let Some(approval) = &approval {
            match &context {
                None => {
                    warn!("Tool approval received without campaign context");
                    return Ok(ChatReply::Immediate(NO_CAMPAIGN_CONTEXT.to_string()));
                }
                Some(context) if approval.tool_name == UPDATE_CAMPAIGN_TOOL => {
                    return Ok(ChatReply::Immediate(
                        self.apply_approval(context, approval).await,
                    ));
                }
                Some(_) => {}
            }
        }

        let choice = ModelChoice::from_key(metadata.model.as_deref());
        info!(model = choice.model_id(), turns = turns.len(), "Sending conversation to model");
        let provider = self.models.provider_for(choice)?;
        let reply = provider.chat(&system_prompt(context.as_ref()), &turns).await?;

        let (update_proposal, text) = take_directive::<CampaignUpdate>(&reply, UPDATE_CAMPAIGN);
        let (social_action, text) = take_directive::<SocialAction>(&text, SOCIAL_ACTION);
        let update_proposal = if context.is_some() {
            update_proposal
        } else {
            None
        };

        Ok(ChatReply::Model {
            text: text.trim_end().to_string(),
            update_proposal,
            social_action: social_action.filter(SocialAction::is_post),
        })
    }

    async fn apply_approval(&self, context: &CampaignContext, approval: &ToolApproval) -> String {
        if !approval.approved {
            info!(campaign_id = %context.id, "Campaign update rejected by user");
            return UPDATE_CANCELLED.to_string();
        }

        let update = CampaignUpdate::from_parameters(&approval.parameters);
        let new_media = update.new_media();
        let input = CampaignInput {
            caption: update
                .caption
                .clone()
                .unwrap_or_else(|| context.caption.clone()),
            media: new_media.clone().or_else(|| context.media.clone()),
        };

        match self.store.update_campaign(&context.id, &input).await {
            Ok(Some(campaign)) => {
                info!(campaign_id = %campaign.id, "Campaign updated via approval");
                if new_media.is_some() {
                    if let Err(e) = self
                        .queue
                        .reindex(IndexRequest::from_campaign(&campaign))
                        .await
                    {
                        warn!(campaign_id = %campaign.id, "Failed to queue campaign re-indexing: {e}");
                    }
                }
                confirmation_message(&update)
            }
            Ok(None) => {
                error!(campaign_id = %context.id, "Approved update targets a missing campaign");
                UPDATE_FAILED.to_string()
            }
            Err(e) => {
                error!(campaign_id = %context.id, "Failed to update campaign after approval: {e}");
                UPDATE_FAILED.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn analysis_trigger_is_case_insensitive() {
        let messages = vec![
            UiMessage::new("user", "!analysis old"),
            UiMessage::new("assistant", "ok"),
            UiMessage::new("user", "  !ANALYSIS   Nike running shoes "),
        ];
        assert_eq!(analysis_query(&messages).as_deref(), Some("Nike running shoes"));

        let bare = vec![UiMessage::new("user", "!analysis")];
        assert_eq!(analysis_query(&bare).as_deref(), Some("!analysis"));

        let plain = vec![UiMessage::new("user", "analysis please")];
        assert!(analysis_query(&plain).is_none());
    }

    #[test]
    fn directives_are_removed_from_the_last_user_turn() {
        let messages = vec![
            UiMessage::new("user", "hi"),
            UiMessage::new("assistant", "hello"),
            UiMessage::new(
                "user",
                "Yes, apply it\n\n<!--TOOL_APPROVAL:{\"approved\":true,\"toolName\":\"updateCampaign\",\"parameters\":{\"caption\":\"New\"}}-->\n\n<!--METADATA:{\"campaignContext\":{\"id\":\"c1\",\"caption\":\"Old\",\"media\":null},\"model\":\"gpt-oss-20b\"}-->",
            ),
        ];
        let prepared = prepare(&messages);
        assert_eq!(prepared.turns.len(), 3);
        assert_eq!(prepared.turns[2].content, "Yes, apply it");
        assert_eq!(prepared.metadata.model.as_deref(), Some("gpt-oss-20b"));
        assert_eq!(prepared.metadata.campaign_context.unwrap().id, "c1");
        let approval = prepared.approval.unwrap();
        assert!(approval.approved);
        assert_eq!(approval.tool_name, UPDATE_CAMPAIGN_TOOL);
    }

    #[test]
    fn confirmation_lists_caption_and_media_changes() {
        let update = CampaignUpdate::from_parameters(
            json!({
                "caption": "Line one\nLine two",
                "mediaType": "video",
                "mediaUrl": "https://cdn.example.com/v.mp4",
                "mediaName": 42
            })
            .as_object()
            .unwrap(),
        );
        assert!(update.media_name.is_none());
        assert_eq!(
            confirmation_message(&update),
            "✅ Campaign updated successfully.\n\n**New caption:**\n> Line one\n> Line two\n\n**Media updated:** video • https://cdn.example.com/v.mp4"
        );

        let media_without_url = CampaignUpdate::from_parameters(
            json!({"mediaType": "image"}).as_object().unwrap(),
        );
        assert_eq!(confirmation_message(&media_without_url), UPDATE_SUCCEEDED);
    }

    #[test]
    fn campaign_section_is_added_only_with_context() {
        assert!(!system_prompt(None).contains("CURRENT CAMPAIGN CONTEXT"));
        let context = CampaignContext {
            id: "c9".into(),
            caption: "Summer sale".into(),
            media: None,
        };
        let prompt = system_prompt(Some(&context));
        assert!(prompt.contains("campaign ID: c9"));
        assert!(prompt.contains("No media attached"));
    }
}
