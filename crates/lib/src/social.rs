//! Social posting through Composio-managed accounts.

use crate::errors::ProviderError;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use tracing::{error, info, warn};

pub const DEFAULT_COMPOSIO_API_URL: &str = "https://backend.composio.dev/api/v3";
pub const POST_TO_SOCIAL: &str = "post_to_social";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Linkedin,
    Twitter,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Linkedin => "linkedin",
            Platform::Twitter => "twitter",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instagram" => Ok(Platform::Instagram),
            "linkedin" => Ok(Platform::Linkedin),
            "twitter" => Ok(Platform::Twitter),
            other => Err(format!("unsupported platform '{other}'")),
        }
    }
}

/// A post proposed by the assistant and approved by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialAction {
    #[serde(rename = "type")]
    pub action_type: String,
    pub platform: Platform,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
}

impl SocialAction {
    pub fn is_post(&self) -> bool {
        self.action_type == POST_TO_SOCIAL && !self.content.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedAccounts {
    pub instagram: bool,
    pub linkedin: bool,
    pub twitter: bool,
}

#[derive(Deserialize, Debug)]
struct AccountList {
    #[serde(default)]
    items: Vec<ConnectedAccount>,
}

#[derive(Deserialize, Debug)]
struct ConnectedAccount {
    #[serde(default)]
    toolkit: Option<Toolkit>,
}

#[derive(Deserialize, Debug)]
struct Toolkit {
    #[serde(default)]
    slug: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ToolExecution {
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    successful: Option<bool>,
}

impl ToolExecution {
    fn data_id(&self) -> Option<String> {
        match self.data.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ComposioClient {
    client: ReqwestClient,
    api_url: String,
    api_key: Option<String>,
}

impl ComposioClient {
    pub fn new(api_url: String, api_key: Option<String>) -> Result<Self, ProviderError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(ProviderError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ProviderError::MissingApiKey("Composio"))
    }

    /// Toolkit slugs of the accounts `user_id` has connected.
    pub async fn connected_toolkits(&self, user_id: &str) -> Result<Vec<String>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/connected_accounts", self.api_url))
            .header("x-api-key", self.api_key()?)
            .query(&[("user_ids", user_id)])
            .send()
            .await
            .map_err(|source| ProviderError::ServiceRequest {
                service: "Composio",
                source,
            })?;
        let list: AccountList = read_json(response).await?;
        Ok(list
            .items
            .into_iter()
            .filter_map(|acc| acc.toolkit.and_then(|t| t.slug))
            .collect())
    }

    async fn execute_tool(
        &self,
        tool: &str,
        user_id: &str,
        arguments: Value,
    ) -> Result<ToolExecution, ProviderError> {
        let response = self
            .client
            .post(format!("{}/tools/execute/{tool}", self.api_url))
            .header("x-api-key", self.api_key()?)
            .json(&json!({ "user_id": user_id, "arguments": arguments }))
            .send()
            .await
            .map_err(|source| ProviderError::ServiceRequest {
                service: "Composio",
                source,
            })?;
        read_json(response).await
    }

    /// Publishes `action` on behalf of `user_id`. Failures are reported in the result.
    pub async fn execute_social_action(&self, action: &SocialAction, user_id: &str) -> ActionResult {
        let platform = action.platform;
        info!(%platform, %user_id, "Executing social action");

        let toolkits = match self.connected_toolkits(user_id).await {
            Ok(toolkits) => toolkits,
            Err(e) => return failure(platform, &e.to_string()),
        };
        let connected = toolkits
            .iter()
            .any(|slug| slug == platform.as_str() || slug.to_lowercase().contains(platform.as_str()));
        if !connected {
            warn!(%platform, %user_id, "No connected account for platform");
            return ActionResult {
                success: false,
                message: format!(
                    "No {platform} account connected. Please connect your account first."
                ),
                action_id: None,
            };
        }

        match self.post(action, user_id).await {
            Ok(action_id) => ActionResult {
                success: true,
                message: format!("Successfully posted to {platform}!"),
                action_id,
            },
            Err(message) => failure(platform, &message),
        }
    }

    async fn post(&self, action: &SocialAction, user_id: &str) -> Result<Option<String>, String> {
        let media = action.media.as_deref().filter(|m| !m.trim().is_empty());
        let result = match action.platform {
            Platform::Instagram => {
                let Some(image_url) = media else {
                    return Err(
                        "Instagram requires media for posts. Please provide an image or video."
                            .to_string(),
                    );
                };
                let user_info = self
                    .execute_tool("INSTAGRAM_GET_USER_INFO", user_id, json!({}))
                    .await
                    .map_err(|e| e.to_string())?;
                let ig_user_id = user_info
                    .data_id()
                    .ok_or("Instagram user info did not include an account id")?;

                let container = self
                    .execute_tool(
                        "INSTAGRAM_CREATE_MEDIA_CONTAINER",
                        user_id,
                        json!({
                            "ig_user_id": ig_user_id,
                            "caption": action.content,
                            "content_type": "photo",
                            "image_url": image_url,
                        }),
                    )
                    .await
                    .map_err(|e| e.to_string())?;
                if container.successful != Some(true) {
                    return Err(format!(
                        "Failed to create media container: {}",
                        container.error.unwrap_or_default()
                    ));
                }
                let creation_id = container
                    .data_id()
                    .ok_or("Media container response did not include an id")?;

                self.execute_tool(
                    "INSTAGRAM_CREATE_POST",
                    user_id,
                    json!({ "ig_user_id": ig_user_id, "creation_id": creation_id }),
                )
                .await
                .map_err(|e| e.to_string())?
            }
            Platform::Linkedin | Platform::Twitter => {
                let tool = if action.platform == Platform::Linkedin {
                    "LINKEDIN_CREATE_POST"
                } else {
                    "TWITTER_CREATE_POST"
                };
                let mut arguments = json!({ "text": action.content });
                if let Some(media_url) = media {
                    arguments["media_url"] = json!(media_url);
                }
                self.execute_tool(tool, user_id, arguments)
                    .await
                    .map_err(|e| e.to_string())?
            }
        };

        if result.successful == Some(false) {
            return Err(result
                .error
                .clone()
                .unwrap_or_else(|| "Action execution failed".to_string()));
        }
        Ok(result.data_id())
    }

    /// Which platforms `user_id` has connected. Lookup failures report none.
    pub async fn check_connected_accounts(&self, user_id: &str) -> ConnectedAccounts {
        match self.connected_toolkits(user_id).await {
            Ok(toolkits) => ConnectedAccounts {
                instagram: toolkits.iter().any(|s| s == "instagram"),
                linkedin: toolkits.iter().any(|s| s == "linkedin"),
                twitter: toolkits.iter().any(|s| s == "twitter"),
            },
            Err(e) => {
                error!(%user_id, "Failed to check connected accounts: {e}");
                ConnectedAccounts::default()
            }
        }
    }
}

fn failure(platform: Platform, message: &str) -> ActionResult {
    error!(%platform, "Social action failed: {message}");
    ActionResult {
        success: false,
        message: format!("Failed to post to {platform}: {message}"),
        action_id: None,
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::ServiceApi {
            service: "Composio",
            status: status.as_u16(),
            body,
        });
    }
    response
        .json()
        .await
        .map_err(|source| ProviderError::ServiceRequest {
            service: "Composio",
            source,
        })
}
