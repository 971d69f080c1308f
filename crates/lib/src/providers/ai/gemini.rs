use crate::{
    errors::ProviderError,
    prompts::media::{caption_user_prompt, CAPTION_SYSTEM_PROMPT},
    providers::ai::{AiProvider, Captioner, ChatTurn, TurnRole},
    types::MediaType,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::{header::CONTENT_TYPE, Client as ReqwestClient};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::{debug, warn};

// --- Gemini-specific request and response structures ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize, Debug)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: ContentResponse,
}

#[derive(Deserialize, Debug)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize, Debug)]
struct PartResponse {
    #[serde(default)]
    text: Option<String>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Part {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

// --- Gemini Provider implementation ---

/// A provider for interacting with the Google Gemini `generateContent` API.
///
/// The same client serves chat completions and media captioning; the model is
/// part of `api_url`.
#[derive(Clone, Debug)]
pub struct GeminiProvider {
    client: ReqwestClient,
    api_url: String,
    api_key: Option<String>,
}

impl GeminiProvider {
    /// Creates a new `GeminiProvider`.
    ///
    /// A missing key is reported when the provider is first called, not here.
    pub fn new(api_url: String, api_key: Option<String>) -> Result<Self, ProviderError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(ProviderError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url,
            api_key,
        })
    }

    /// Builds the `generateContent` URL for a model under a base such as
    /// `https://generativelanguage.googleapis.com/v1beta`.
    pub fn model_url(api_base: &str, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!(
            "{}/models/{model}:generateContent",
            api_base.trim_end_matches('/')
        )
    }

    async fn send(&self, request_body: &GeminiRequest) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ProviderError::MissingApiKey("Gemini"))?;

        let response = self
            .client
            .post(&self.api_url)
            .query(&[("key", api_key)])
            .json(request_body)
            .send()
            .await
            .map_err(ProviderError::AiRequest)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::AiApi(error_text));
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(ProviderError::AiDeserialization)?;

        let text = gemini_response
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(text)
    }

    /// Asks the media host for the asset's MIME type, falling back to a per-kind default.
    async fn resolve_mime_type(&self, url: &str, media_type: MediaType) -> String {
        match self.client.head(url).send().await {
            Ok(response) if response.status().is_success() => response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| media_type.fallback_mime().to_string()),
            Ok(response) => {
                debug!(status = %response.status(), "HEAD request did not succeed; using fallback MIME type");
                media_type.fallback_mime().to_string()
            }
            Err(e) => {
                warn!("Failed to resolve media type via HEAD request: {e}");
                media_type.fallback_mime().to_string()
            }
        }
    }

    async fn fetch_media(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ProviderError::ServiceRequest {
                service: "media host",
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ServiceApi {
                service: "media host",
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| ProviderError::ServiceRequest {
                service: "media host",
                source,
            })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl AiProvider for GeminiProvider {
    async fn chat(&self, system_prompt: &str, turns: &[ChatTurn]) -> Result<String, ProviderError> {
        let contents = turns
            .iter()
            .map(|turn| Content {
                role: Some(match turn.role {
                    TurnRole::User => "user",
                    TurnRole::Assistant => "model",
                }),
                parts: vec![Part::text(turn.content.clone())],
            })
            .collect();

        let request_body = GeminiRequest {
            system_instruction: (!system_prompt.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part::text(system_prompt)],
            }),
            contents,
        };

        self.send(&request_body).await
    }
}

#[async_trait]
impl Captioner for GeminiProvider {
    async fn caption(
        &self,
        url: &str,
        media_type: MediaType,
        name: Option<&str>,
    ) -> Result<String, ProviderError> {
        let mime_type = self.resolve_mime_type(url, media_type).await;
        debug!(%url, %mime_type, name = name.unwrap_or_default(), "--> Captioning media with Gemini");
        let media = self.fetch_media(url).await?;

        let request_body = GeminiRequest {
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part::text(CAPTION_SYSTEM_PROMPT)],
            }),
            contents: vec![Content {
                role: Some("user"),
                parts: vec![
                    Part::text(caption_user_prompt(media_type)),
                    Part {
                        inline_data: Some(InlineData {
                            mime_type,
                            data: BASE64.encode(media),
                        }),
                        ..Default::default()
                    },
                ],
            }],
        };

        let summary = self.send(&request_body).await?.trim().to_string();
        if summary.is_empty() {
            return Err(ProviderError::AiApi(format!(
                "Gemini did not return a summary for {url}"
            )));
        }
        Ok(summary)
    }
}
