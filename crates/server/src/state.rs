//! # Application State
//!
//! This module defines the shared application state (`AppState`) and the logic
//! for building it at startup. Every collaborator client is constructed exactly once
//! here and handed to the handlers by reference; nothing is a module-level singleton.

use crate::config::AppConfig;
use adintel::{
    chat::{ChatAssistant, HostedModels},
    download::VideoDownloader,
    providers::{
        ai::{gemini::GeminiProvider, EmbeddingClient},
        media::{MediaStore, SupabaseStorage},
        vector::{SqliteVectorIndex, VectorIndex},
    },
    research::{CompetitorResearch, ResearchSettings},
    social::ComposioClient,
    web::BrightDataClient,
    IndexQueue, IndexingPipeline, JobStore, PipelineSettings, QueueSettings, SqliteProvider,
};
use std::{sync::Arc, time::Duration};
use tracing::info;

/// The shared application state, accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration, loaded from `config.yml` and the environment.
    pub config: Arc<AppConfig>,
    /// The relational store for content items, campaigns and chat history.
    pub sqlite_provider: Arc<SqliteProvider>,
    pub vector_index: Box<dyn VectorIndex>,
    /// The durable indexing queue; it also owns the pipeline used by `/content/process`.
    pub queue: IndexQueue,
    pub media_store: Box<dyn MediaStore>,
    pub chat: ChatAssistant,
    pub social: ComposioClient,
    pub web: BrightDataClient,
    pub downloader: VideoDownloader,
}

impl AppState {
    pub fn pipeline(&self) -> &IndexingPipeline {
        self.queue.pipeline()
    }

    /// The collection content items and campaigns are indexed into.
    pub fn collection(&self) -> &str {
        &self.pipeline().settings().collection
    }
}

/// Builds the shared application state from the configuration.
///
/// This function initializes all necessary services:
/// - It opens the SQLite database and ensures the schema exists.
/// - It wires the captioner, embedder and vector index into the indexing pipeline
///   and starts the queue worker, re-dispatching jobs a previous run left unfinished.
/// - It instantiates the clients for chat, research, posting, web research and downloads.
///
/// Missing API keys are not an error here; the dependent endpoint reports them.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let sqlite_provider = SqliteProvider::new(&config.db_url).await?;
    info!(db_path = %config.db_url, "Initialized local storage provider (SQLite).");
    // Ensure the database schema is up-to-date on startup.
    sqlite_provider.initialize_schema().await?;

    let embedder = EmbeddingClient::new(
        config.embedding.api_url.clone(),
        config.embedding.model_name.clone(),
        config.embedding.api_key.clone(),
    )?;
    let vector_index = SqliteVectorIndex::new(sqlite_provider.db.clone(), Box::new(embedder));

    let captioner = GeminiProvider::new(
        GeminiProvider::model_url(&config.gemini.api_base, &config.gemini.caption_model),
        config.gemini.api_key.clone(),
    )?;

    let pipeline = IndexingPipeline::new(
        Box::new(captioner),
        Box::new(sqlite_provider.clone()),
        Box::new(vector_index.clone()),
        PipelineSettings {
            collection: config.vector_index.collection.clone(),
            min_summary_len: config.indexing.min_summary_len,
        },
    );
    let queue = IndexQueue::start(
        pipeline,
        JobStore::new(sqlite_provider.db.clone()),
        QueueSettings {
            max_attempts: config.indexing.max_attempts.max(1),
            retry_delay: Duration::from_millis(config.indexing.retry_delay_ms),
            concurrency: config.indexing.concurrency.max(1),
        },
    );
    let resumed = queue.resume_pending().await?;
    info!(resumed, "Indexing queue started.");

    let media_store = SupabaseStorage::new(
        config.media_store.url.clone(),
        config.media_store.api_key.clone(),
        config.media_store.bucket.clone(),
    )?;

    let research = CompetitorResearch::new(ResearchSettings {
        api_url: config.anthropic.api_url.clone(),
        api_key: config.anthropic.api_key.clone(),
        api_version: config.anthropic.api_version.clone(),
        model: config.anthropic.research_model.clone(),
        max_tokens: config.anthropic.research_max_tokens,
        web_search_beta: config.anthropic.web_search_beta.clone(),
        web_search: config.anthropic.web_search,
    })?;
    let models = HostedModels {
        anthropic_api_url: config.anthropic.api_url.clone(),
        anthropic_api_key: config.anthropic.api_key.clone(),
        anthropic_version: config.anthropic.api_version.clone(),
        gemini_api_base: config.gemini.api_base.clone(),
        gemini_api_key: config.gemini.api_key.clone(),
        groq_api_url: config.groq.api_url.clone(),
        groq_api_key: config.groq.api_key.clone(),
    };
    let chat = ChatAssistant::new(
        Box::new(models),
        sqlite_provider.clone(),
        queue.clone(),
        research,
    );

    let social = ComposioClient::new(
        config.composio.api_url.clone(),
        config.composio.api_key.clone(),
    )?;
    let web = BrightDataClient::new(
        config.brightdata.api_url.clone(),
        config.brightdata.token.clone(),
    )?;
    let downloader = VideoDownloader::new(config.tiktok.api_url.clone())?;

    Ok(AppState {
        config: Arc::new(config),
        sqlite_provider: Arc::new(sqlite_provider),
        vector_index: Box::new(vector_index),
        queue,
        media_store: Box::new(media_store),
        chat,
        social,
        web,
        downloader,
    })
}
