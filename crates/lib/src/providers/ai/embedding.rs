//! # Embeddings Provider
//!
//! Vector embeddings for the vector index, produced by an external OpenAI-compatible
//! or Gemini `embedContent` endpoint. The flavour is picked from the endpoint host
//! once, when the client is built.

use crate::errors::ProviderError;
use async_trait::async_trait;
use dyn_clone::DynClone;
use reqwest::{Client as ReqwestClient, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt::Debug;
use tracing::debug;

const GEMINI_HOST: &str = "generativelanguage.googleapis.com";

/// Turns text into a vector for similarity search.
#[async_trait]
pub trait Embedder: Send + Sync + Debug + DynClone {
    async fn embed(&self, input: &str) -> Result<Vec<f32>, ProviderError>;
}

dyn_clone::clone_trait_object!(Embedder);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EmbeddingApi {
    OpenAiCompatible,
    Gemini,
}

#[derive(Deserialize)]
struct OpenAiEmbeddings {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct GeminiEmbeddings {
    embedding: GeminiValues,
}

#[derive(Deserialize)]
struct GeminiValues {
    values: Vec<f32>,
}

#[derive(Serialize, Debug)]
struct OpenAiRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// An `Embedder` backed by a remote embeddings endpoint.
#[derive(Clone, Debug)]
pub struct EmbeddingClient {
    client: ReqwestClient,
    api_url: String,
    model: String,
    api_key: Option<String>,
    api: EmbeddingApi,
}

impl EmbeddingClient {
    pub fn new(
        api_url: String,
        model: String,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(ProviderError::ReqwestClientBuild)?;
        let api = if api_url.contains(GEMINI_HOST) {
            EmbeddingApi::Gemini
        } else {
            EmbeddingApi::OpenAiCompatible
        };
        Ok(Self {
            client,
            api_url,
            model,
            api_key: api_key.filter(|k| !k.is_empty()),
            api,
        })
    }

    fn request(&self, input: &str) -> RequestBuilder {
        let builder = self.client.post(&self.api_url);
        match self.api {
            EmbeddingApi::OpenAiCompatible => {
                let body = OpenAiRequest {
                    model: &self.model,
                    input,
                };
                debug!(model = %self.model, "--> Requesting OpenAI-compatible embedding");
                let builder = builder.json(&body);
                match &self.api_key {
                    Some(key) => builder.bearer_auth(key),
                    None => builder,
                }
            }
            EmbeddingApi::Gemini => {
                // The payload names the model as `models/<id>`; the key goes in a header.
                let model = if self.model.starts_with("models/") {
                    self.model.clone()
                } else {
                    format!("models/{}", self.model)
                };
                debug!(%model, "--> Requesting Gemini embedding");
                let builder = builder.json(&json!({
                    "model": model,
                    "content": { "parts": [{ "text": input }] }
                }));
                match &self.api_key {
                    Some(key) => builder.header("x-goog-api-key", key),
                    None => builder,
                }
            }
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, input: &str) -> Result<Vec<f32>, ProviderError> {
        let response = self
            .request(input)
            .send()
            .await
            .map_err(ProviderError::AiRequest)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::AiApi(error_text));
        }

        match self.api {
            EmbeddingApi::Gemini => {
                let body: GeminiEmbeddings = response
                    .json()
                    .await
                    .map_err(ProviderError::AiDeserialization)?;
                Ok(body.embedding.values)
            }
            EmbeddingApi::OpenAiCompatible => {
                let body: OpenAiEmbeddings = response
                    .json()
                    .await
                    .map_err(ProviderError::AiDeserialization)?;
                body.data
                    .into_iter()
                    .next()
                    .map(|d| d.embedding)
                    .ok_or_else(|| {
                        ProviderError::AiApi("Embeddings endpoint returned no vectors".to_string())
                    })
            }
        }
    }
}
