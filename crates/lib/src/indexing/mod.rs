//! # Content Indexing
//!
//! Guarantees that every content item eventually lands in the vector index with a
//! searchable, captioned text representation.
//!
//! - [`pipeline`]: the caption → persist → index sequence for one item.
//! - [`jobs`]: durable intent records, written before the caller gets its response.
//! - [`queue`]: the in-process worker that drains jobs with bounded retries.

pub mod jobs;
pub mod pipeline;
pub mod queue;

pub use jobs::{IndexJob, JobStatus, JobStore};
pub use pipeline::{is_invalid_summary, IndexingPipeline, PipelineSettings, ProcessReport};
pub use queue::{IndexQueue, QueueSettings};

use crate::errors::ProviderError;
use crate::types::{Category, ContentItem, ContentType, MediaType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Captioning failed for {id}: {source}")]
    Captioning {
        id: String,
        #[source]
        source: ProviderError,
    },
    #[error("Captioning returned an empty summary for {0}")]
    EmptyCaption(String),
    #[error("Vector index operation failed: {0}")]
    VectorIndex(ProviderError),
    #[error("Job store error: {0}")]
    JobStore(#[from] ProviderError),
    #[error("Invalid job record {id}: {reason}")]
    InvalidJob { id: String, reason: String },
    #[error("Indexing queue is closed")]
    QueueClosed,
}

/// A description of one item to bring into the vector index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    /// The kind of media behind `url`, required for campaigns.
    #[serde(default)]
    pub media_type: Option<MediaType>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
}

impl IndexRequest {
    /// The media type to caption with, if the item carries captionable media.
    pub fn caption_media_type(&self) -> Option<MediaType> {
        match self.content_type {
            ContentType::Campaign => self.media_type,
            other => other.media_type(),
        }
    }

    pub fn from_content_item(item: &ContentItem) -> Self {
        Self {
            id: item.id.clone(),
            content_type: item.content_type,
            name: item.name.clone(),
            url: item.url.clone(),
            media_type: item
                .content_type
                .media_type()
                .or_else(|| item.url.as_deref().and_then(MediaType::from_url)),
            caption: None,
            summary: item.summary.clone(),
            category: Some(item.category),
        }
    }

    /// Campaigns are indexed from their media only; the caption never becomes the summary.
    pub fn from_campaign(campaign: &crate::types::Campaign) -> Self {
        Self {
            id: campaign.id.clone(),
            content_type: ContentType::Campaign,
            name: campaign
                .media
                .as_ref()
                .and_then(|m| m.name.clone())
                .unwrap_or_else(|| format!("campaign-{}", campaign.id)),
            url: campaign.media.as_ref().map(|m| m.url.clone()),
            media_type: campaign.media.as_ref().map(|m| m.media_type),
            caption: Some(campaign.caption.clone()),
            summary: None,
            category: Some(Category::Campaigns),
        }
    }
}

/// What `ensure_indexed` did for an item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IndexReport {
    Indexed {
        added: usize,
        summary: String,
        captioned: bool,
    },
    AlreadyIndexed {
        skipped: usize,
    },
    Skipped {
        reason: String,
    },
}
