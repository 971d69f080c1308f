use crate::{
    errors::ProviderError,
    providers::ai::{
        anthropic::AnthropicProvider, gemini::GeminiProvider, openai_compat::OpenAiCompatProvider,
        AiProvider,
    },
};
use dyn_clone::DynClone;
use std::fmt::Debug;
use tracing::warn;

const CHAT_MAX_TOKENS: u32 = 4096;

/// The chat models a user can pick, keyed by the names the client sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelChoice {
    Claude45,
    Gemini25Flash,
    Qwen3_32b,
    LlamaGuard,
    GptOss20b,
}

/// Where a model is hosted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelHost {
    Anthropic,
    Gemini,
    Groq,
}

impl ModelChoice {
    /// Resolves a client key; absent or unknown keys fall back to Claude.
    pub fn from_key(key: Option<&str>) -> Self {
        match key.unwrap_or("claude-4.5") {
            "claude-4.5" => ModelChoice::Claude45,
            "gemini-2.5-flash" => ModelChoice::Gemini25Flash,
            "qwen-3-32b" => ModelChoice::Qwen3_32b,
            "llama-guard" => ModelChoice::LlamaGuard,
            "gpt-oss-20b" => ModelChoice::GptOss20b,
            unknown => {
                warn!(model = %unknown, "Unknown model key, defaulting to Claude");
                ModelChoice::Claude45
            }
        }
    }

    pub fn model_id(&self) -> &'static str {
        match self {
            ModelChoice::Claude45 => "claude-sonnet-4-5-20250929",
            ModelChoice::Gemini25Flash => "gemini-2.5-flash-lite",
            ModelChoice::Qwen3_32b => "qwen/qwen3-32b",
            ModelChoice::LlamaGuard => "meta-llama/llama-guard-4-12b",
            ModelChoice::GptOss20b => "openai/gpt-oss-20b",
        }
    }

    pub fn host(&self) -> ModelHost {
        match self {
            ModelChoice::Claude45 => ModelHost::Anthropic,
            ModelChoice::Gemini25Flash => ModelHost::Gemini,
            _ => ModelHost::Groq,
        }
    }
}

/// Supplies a ready chat provider for a model choice.
pub trait ChatModels: Send + Sync + Debug + DynClone {
    fn provider_for(&self, choice: ModelChoice) -> Result<Box<dyn AiProvider>, ProviderError>;
}

dyn_clone::clone_trait_object!(ChatModels);

/// Endpoints and keys for the hosted chat models.
#[derive(Debug, Clone, Default)]
pub struct HostedModels {
    pub anthropic_api_url: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_version: String,
    /// Base such as `https://generativelanguage.googleapis.com/v1beta`.
    pub gemini_api_base: String,
    pub gemini_api_key: Option<String>,
    pub groq_api_url: String,
    pub groq_api_key: Option<String>,
}

impl ChatModels for HostedModels {
    fn provider_for(&self, choice: ModelChoice) -> Result<Box<dyn AiProvider>, ProviderError> {
        let model = choice.model_id().to_string();
        Ok(match choice.host() {
            ModelHost::Anthropic => Box::new(AnthropicProvider::new(
                self.anthropic_api_url.clone(),
                self.anthropic_api_key.clone(),
                self.anthropic_version.clone(),
                model,
                CHAT_MAX_TOKENS,
            )?),
            ModelHost::Gemini => Box::new(GeminiProvider::new(
                GeminiProvider::model_url(&self.gemini_api_base, &model),
                self.gemini_api_key.clone(),
            )?),
            ModelHost::Groq => Box::new(OpenAiCompatProvider::new(
                self.groq_api_url.clone(),
                self.groq_api_key.clone(),
                model,
                "Groq",
            )?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_keys_map_to_hosted_models() {
        assert_eq!(ModelChoice::from_key(None), ModelChoice::Claude45);
        assert_eq!(ModelChoice::from_key(Some("nope")), ModelChoice::Claude45);
        assert_eq!(
            ModelChoice::from_key(Some("gemini-2.5-flash")).model_id(),
            "gemini-2.5-flash-lite"
        );
        let qwen = ModelChoice::from_key(Some("qwen-3-32b"));
        assert_eq!(qwen.model_id(), "qwen/qwen3-32b");
        assert_eq!(qwen.host(), ModelHost::Groq);
        assert_eq!(ModelChoice::from_key(Some("llama-guard")).host(), ModelHost::Groq);
    }
}
