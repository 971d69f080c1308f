//! # Application Configuration
//!
//! This module defines the configuration structure for the `adintel-server` and
//! provides the logic for loading it from a `config.yml` file and environment
//! variables. Every section has defaults, so the server starts without a file; API
//! keys are only checked when the endpoint that needs them is called.

use adintel::{
    download::DEFAULT_TIKWM_API_URL,
    indexing::pipeline::{DEFAULT_COLLECTION, DEFAULT_MIN_SUMMARY_LEN},
    providers::{
        ai::{anthropic::DEFAULT_ANTHROPIC_API_URL, anthropic::DEFAULT_ANTHROPIC_VERSION,
            openai_compat::DEFAULT_GROQ_API_URL},
        media::DEFAULT_BUCKET,
    },
    research::{DEFAULT_RESEARCH_MAX_TOKENS, DEFAULT_RESEARCH_MODEL},
    social::DEFAULT_COMPOSIO_API_URL,
    web::DEFAULT_BRIGHTDATA_API_URL,
};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs;
use tracing::info;

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates an explicitly requested configuration file was not found.
    NotFound(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the server to listen on. Loaded from `PORT` env var.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The path to the SQLite database file. Loaded from `DB_URL` env var.
    #[serde(default = "default_db_url")]
    pub db_url: String,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub anthropic: AnthropicConfig,
    #[serde(default)]
    pub groq: GroqConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub vector_index: VectorIndexConfig,
    #[serde(default)]
    pub media_store: MediaStoreConfig,
    #[serde(default)]
    pub brightdata: BrightDataConfig,
    #[serde(default)]
    pub composio: ComposioConfig,
    #[serde(default)]
    pub tiktok: TikTokConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
}

/// Provides a default value for the `port` field if not set in the environment.
fn default_port() -> u16 {
    9090
}
/// Provides a default value for the `db_url` field if not set in the environment.
fn default_db_url() -> String {
    "db/adintel.db".to_string()
}

/// Gemini serves captioning and the `gemini-2.5-flash` chat model.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeminiConfig {
    /// Base such as `https://generativelanguage.googleapis.com/v1beta`.
    pub api_base: String,
    pub api_key: Option<String>,
    pub caption_model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: None,
            caption_model: "gemini-2.5-flash".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnthropicConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub api_version: String,
    /// Competitor research settings.
    pub research_model: String,
    pub research_max_tokens: u32,
    pub web_search_beta: Option<String>,
    pub web_search: bool,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_ANTHROPIC_API_URL.to_string(),
            api_key: None,
            api_version: DEFAULT_ANTHROPIC_VERSION.to_string(),
            research_model: DEFAULT_RESEARCH_MODEL.to_string(),
            research_max_tokens: DEFAULT_RESEARCH_MAX_TOKENS,
            web_search_beta: None,
            web_search: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GroqConfig {
    pub api_url: String,
    pub api_key: Option<String>,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_GROQ_API_URL.to_string(),
            api_key: None,
        }
    }
}

/// Configuration for the embedding model provider.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub api_url: String,
    pub model_name: String,
    pub api_key: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_url: "https://generativelanguage.googleapis.com/v1beta/models/text-embedding-004:embedContent".to_string(),
            model_name: "text-embedding-004".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VectorIndexConfig {
    /// The collection content items and campaigns are indexed into.
    pub collection: String,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MediaStoreConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub bucket: String,
}

impl Default for MediaStoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            bucket: DEFAULT_BUCKET.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BrightDataConfig {
    pub api_url: String,
    pub token: Option<String>,
}

impl Default for BrightDataConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_BRIGHTDATA_API_URL.to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ComposioConfig {
    pub api_url: String,
    pub api_key: Option<String>,
}

impl Default for ComposioConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_COMPOSIO_API_URL.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TikTokConfig {
    pub api_url: String,
}

impl Default for TikTokConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_TIKWM_API_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndexingConfig {
    pub min_summary_len: usize,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub concurrency: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            min_summary_len: DEFAULT_MIN_SUMMARY_LEN,
            max_attempts: 3,
            retry_delay_ms: 2000,
            concurrency: 4,
        }
    }
}

// Helper to read a file, substitute env vars, and return its content.
// Returns Ok(None) if the file does not exist, or an error if it fails to read.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}")
        .map_err(|e| ConfigError::General(e.to_string()))?;
    let expanded_content = re.replace_all(&content, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_default()
    });

    Ok(Some(expanded_content.to_string()))
}

/// Fills `slot` from the first non-empty environment variable in `vars`.
fn fill_from_env(slot: &mut Option<String>, vars: &[&str]) {
    if slot.as_deref().is_some_and(|v| !v.is_empty()) {
        return;
    }
    *slot = vars
        .iter()
        .filter_map(|var| env::var(var).ok())
        .find(|value| !value.is_empty());
}

/// Loads the application configuration from a file and environment variables.
///
/// - Top-level keys like `port` and `db_url` are overridden by `PORT` and `DB_URL`.
/// - Nested keys are overridden by `ADINTEL_...` variables (e.g., `ADINTEL_GEMINI__API_KEY`).
/// - Provider keys still unset afterwards are read from their conventional variables
///   (`GEMINI_API_KEY`, `ANTHROPIC_API_KEY`, ...).
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let base_path = env!("CARGO_MANIFEST_DIR");
    let mut builder = ConfigBuilder::builder();

    let (main_config_path, required) = match config_path_override {
        Some(path) => (path.to_string(), true),
        None => (format!("{base_path}/config.yml"), false),
    };
    match read_and_substitute(&main_config_path)? {
        Some(content) => {
            info!("Loading configuration from '{main_config_path}'.");
            builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
        }
        None if required => {
            return Err(ConfigError::NotFound(format!(
                "Config file not found at '{main_config_path}'."
            )));
        }
        None => info!("No config.yml found; using defaults and environment."),
    }

    let settings = builder
        // Load environment variables for top-level keys like PORT.
        .add_source(Environment::default())
        // Load prefixed environment variables for deeper overrides.
        .add_source(
            Environment::with_prefix("ADINTEL")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    let mut config: AppConfig = settings.try_deserialize()?;

    fill_from_env(
        &mut config.gemini.api_key,
        &["GEMINI_API_KEY", "GOOGLE_GENERATIVE_AI_API_KEY"],
    );
    fill_from_env(&mut config.anthropic.api_key, &["ANTHROPIC_API_KEY"]);
    fill_from_env(&mut config.groq.api_key, &["GROQ_API_KEY"]);
    fill_from_env(&mut config.embedding.api_key, &["EMBEDDINGS_API_KEY", "GEMINI_API_KEY"]);
    fill_from_env(&mut config.media_store.url, &["SUPABASE_URL"]);
    fill_from_env(&mut config.media_store.api_key, &["SUPABASE_ANON_KEY"]);
    fill_from_env(&mut config.brightdata.token, &["BRIGHTDATA_TOKEN"]);
    fill_from_env(&mut config.composio.api_key, &["COMPOSIO_API_KEY"]);

    Ok(config)
}
