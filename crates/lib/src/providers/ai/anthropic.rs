use crate::{
    errors::ProviderError,
    providers::ai::{AiProvider, ChatTurn},
};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub const DEFAULT_ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";

// --- Anthropic Messages API structures ---

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "str::is_empty")]
    system: &'a str,
    messages: &'a [ChatTurn],
}

#[derive(Deserialize, Debug)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize, Debug)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

/// A provider for the Anthropic Messages API.
#[derive(Clone, Debug)]
pub struct AnthropicProvider {
    client: ReqwestClient,
    api_url: String,
    api_key: Option<String>,
    api_version: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicProvider {
    pub fn new(
        api_url: String,
        api_key: Option<String>,
        api_version: String,
        model: String,
        max_tokens: u32,
    ) -> Result<Self, ProviderError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(ProviderError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url,
            api_key,
            api_version,
            model,
            max_tokens,
        })
    }
}

#[async_trait]
impl AiProvider for AnthropicProvider {
    async fn chat(&self, system_prompt: &str, turns: &[ChatTurn]) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ProviderError::MissingApiKey("Anthropic"))?;

        let request_body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: system_prompt,
            messages: turns,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", &self.api_version)
            .json(&request_body)
            .send()
            .await
            .map_err(ProviderError::AiRequest)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::AiApi(error_text));
        }

        let messages_response: MessagesResponse = response
            .json()
            .await
            .map_err(ProviderError::AiDeserialization)?;

        Ok(messages_response
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}
