use crate::{
    errors::ProviderError,
    providers::ai::{AiProvider, ChatTurn, TurnRole},
};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub const DEFAULT_GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

// --- OpenAI-compatible request and response structures ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    messages: Vec<CompletionMessage>,
    model: &'a str,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct CompletionMessage {
    role: String,
    content: String,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize, Debug)]
struct CompletionChoice {
    message: CompletionMessage,
}

/// A provider for OpenAI-compatible chat completion APIs, such as Groq.
#[derive(Clone, Debug)]
pub struct OpenAiCompatProvider {
    client: ReqwestClient,
    api_url: String,
    api_key: Option<String>,
    model: String,
    /// Label used in errors when the key is missing.
    service: &'static str,
}

impl OpenAiCompatProvider {
    pub fn new(
        api_url: String,
        api_key: Option<String>,
        model: String,
        service: &'static str,
    ) -> Result<Self, ProviderError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(ProviderError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url,
            api_key,
            model,
            service,
        })
    }
}

#[async_trait]
impl AiProvider for OpenAiCompatProvider {
    async fn chat(&self, system_prompt: &str, turns: &[ChatTurn]) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ProviderError::MissingApiKey(self.service))?;

        let mut messages = Vec::with_capacity(turns.len() + 1);
        if !system_prompt.is_empty() {
            messages.push(CompletionMessage {
                role: "system".to_string(),
                content: system_prompt.to_string(),
            });
        }
        messages.extend(turns.iter().map(|turn| CompletionMessage {
            role: match turn.role {
                TurnRole::User => "user",
                TurnRole::Assistant => "assistant",
            }
            .to_string(),
            content: turn.content.clone(),
        }));

        let request_body = ChatCompletionRequest {
            messages,
            model: &self.model,
            temperature: 0.7,
            stream: false,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(ProviderError::AiRequest)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::AiApi(error_text));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(ProviderError::AiDeserialization)?;

        Ok(completion
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}
