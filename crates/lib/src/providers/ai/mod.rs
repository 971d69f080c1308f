pub mod anthropic;
pub mod embedding;
pub mod gemini;
pub mod openai_compat;

use crate::errors::ProviderError;
use crate::types::MediaType;
use async_trait::async_trait;
use dyn_clone::DynClone;
pub use embedding::{Embedder, EmbeddingClient};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// The speaker of a conversation turn sent to a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One turn of a conversation, as sent to a chat model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// A trait for interacting with a hosted chat model.
///
/// Implementations exist for Gemini, Anthropic and OpenAI-compatible endpoints (Groq).
#[async_trait]
pub trait AiProvider: Send + Sync + Debug + DynClone {
    /// Sends a full conversation and returns the model's reply text.
    async fn chat(&self, system_prompt: &str, turns: &[ChatTurn]) -> Result<String, ProviderError>;

    /// Generates a response from a given system and user prompt.
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError> {
        self.chat(system_prompt, &[ChatTurn::user(user_prompt)])
            .await
    }
}

dyn_clone::clone_trait_object!(AiProvider);

/// A vision-capable model that describes a media asset.
#[async_trait]
pub trait Captioner: Send + Sync + Debug + DynClone {
    /// Returns a natural-language description of the media at `url`.
    ///
    /// An empty description is reported as an error by implementations.
    async fn caption(
        &self,
        url: &str,
        media_type: MediaType,
        name: Option<&str>,
    ) -> Result<String, ProviderError>;
}

dyn_clone::clone_trait_object!(Captioner);
