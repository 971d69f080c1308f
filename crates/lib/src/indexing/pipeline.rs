use super::{IndexError, IndexReport, IndexRequest};
use crate::{
    providers::{
        ai::Captioner,
        db::storage::ContentStore,
        vector::{AddResult, NewDocument, VectorIndex},
    },
    types::{ContentType, IndexStatus},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

pub const DEFAULT_COLLECTION: &str = "user_default";
pub const DEFAULT_MIN_SUMMARY_LEN: usize = 20;
pub const NO_DESCRIPTION: &str = "No description available";

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// The vector collection content items are indexed into.
    pub collection: String,
    /// Summaries shorter than this (in characters) are treated as missing.
    pub min_summary_len: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            min_summary_len: DEFAULT_MIN_SUMMARY_LEN,
        }
    }
}

/// Result of the synchronous persist-and-index path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessReport {
    pub summary: String,
    pub index_result: AddResult,
}

/// A summary is unusable when absent, identical to the item name, or too short.
pub fn is_invalid_summary(summary: Option<&str>, name: &str, min_len: usize) -> bool {
    match summary {
        None => true,
        Some(summary) => summary == name || summary.chars().count() < min_len,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Orchestrates captioning, the summary write-back and the vector insert for one item.
#[derive(Clone, Debug)]
pub struct IndexingPipeline {
    captioner: Box<dyn Captioner>,
    content_store: Box<dyn ContentStore>,
    vector_index: Box<dyn VectorIndex>,
    settings: PipelineSettings,
}

impl IndexingPipeline {
    pub fn new(
        captioner: Box<dyn Captioner>,
        content_store: Box<dyn ContentStore>,
        vector_index: Box<dyn VectorIndex>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            captioner,
            content_store,
            vector_index,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn content_store(&self) -> &dyn ContentStore {
        self.content_store.as_ref()
    }

    pub fn vector_index(&self) -> &dyn VectorIndex {
        self.vector_index.as_ref()
    }

    /// Brings one item into the vector index, captioning its media first when the
    /// supplied summary is unusable.
    pub async fn ensure_indexed(&self, request: &IndexRequest) -> Result<IndexReport, IndexError> {
        let id = request.id.as_str();
        let is_campaign = request.content_type == ContentType::Campaign;
        let media = request
            .caption_media_type()
            .zip(non_empty(request.url.as_deref()));

        if is_campaign && media.is_none() {
            info!(item_id = %id, "Campaign has no media to caption; not indexing");
            self.mark(id, IndexStatus::Skipped, None).await;
            return Ok(IndexReport::Skipped {
                reason: "campaign has no media to caption".to_string(),
            });
        }

        if self
            .vector_index
            .document_exists(&self.settings.collection, id)
            .await
            .map_err(IndexError::VectorIndex)?
        {
            info!(item_id = %id, "Item already indexed; skipping");
            self.mark(id, IndexStatus::Indexed, None).await;
            return Ok(IndexReport::AlreadyIndexed { skipped: 1 });
        }

        // Campaign captions and summaries are never used as the index text.
        let supplied_summary = if is_campaign {
            None
        } else {
            request.summary.as_deref()
        };
        let needs_caption = is_campaign
            || is_invalid_summary(supplied_summary, &request.name, self.settings.min_summary_len);

        let (document, captioned) = match media {
            Some((media_type, url)) if needs_caption => {
                self.mark(id, IndexStatus::Captioning, None).await;
                info!(item_id = %id, %media_type, stage = "captioning", "Requesting caption");
                let caption = self
                    .captioner
                    .caption(url, media_type, Some(&request.name))
                    .await
                    .map_err(|source| IndexError::Captioning {
                        id: id.to_string(),
                        source,
                    })?;
                let caption = caption.trim().to_string();
                if caption.is_empty() {
                    return Err(IndexError::EmptyCaption(id.to_string()));
                }
                self.mark(id, IndexStatus::Captioned, None).await;
                self.persist_summary(id, &caption).await;
                (caption, true)
            }
            _ => (self.fallback_document(request), false),
        };

        let result = self.insert(request, &document).await?;
        self.mark(id, IndexStatus::Indexed, None).await;

        if result.added == 0 {
            debug!(item_id = %id, skipped = result.skipped, "Another writer indexed the item first");
            return Ok(IndexReport::AlreadyIndexed {
                skipped: result.skipped,
            });
        }
        info!(item_id = %id, captioned, stage = "indexed", "Item indexed");
        Ok(IndexReport::Indexed {
            added: result.added,
            summary: document,
            captioned,
        })
    }

    /// Persists a caller-supplied summary and indexes it without captioning.
    pub async fn process_content(&self, request: &IndexRequest) -> Result<ProcessReport, IndexError> {
        let summary = non_empty(request.summary.as_deref())
            .or_else(|| non_empty(Some(request.name.as_str())))
            .unwrap_or(NO_DESCRIPTION)
            .to_string();

        self.persist_summary(&request.id, &summary).await;
        let index_result = self.insert(request, &summary).await?;
        self.mark(&request.id, IndexStatus::Indexed, None).await;

        Ok(ProcessReport {
            summary,
            index_result,
        })
    }

    fn fallback_document(&self, request: &IndexRequest) -> String {
        let is_campaign = request.content_type == ContentType::Campaign;
        let supplied = if is_campaign {
            None
        } else {
            non_empty(request.summary.as_deref()).or_else(|| non_empty(request.caption.as_deref()))
        };
        supplied
            .or_else(|| non_empty(Some(request.name.as_str())))
            .unwrap_or(NO_DESCRIPTION)
            .to_string()
    }

    async fn insert(&self, request: &IndexRequest, document: &str) -> Result<AddResult, IndexError> {
        self.vector_index
            .add_documents(
                &self.settings.collection,
                vec![NewDocument {
                    id: Some(request.id.clone()),
                    document: document.to_string(),
                    metadata: index_metadata(request),
                }],
            )
            .await
            .map_err(IndexError::VectorIndex)
    }

    /// Best effort: a failed or unmatched write is logged and indexing continues.
    async fn persist_summary(&self, id: &str, summary: &str) {
        match self.content_store.update_content_summary(id, summary).await {
            Ok(Some(_)) => info!(item_id = %id, "Stored summary"),
            Ok(None) => warn!(item_id = %id, "No content item to store the summary on"),
            Err(e) => warn!(item_id = %id, "Failed to store summary: {e}"),
        }
    }

    async fn mark(&self, id: &str, status: IndexStatus, error: Option<&str>) {
        if let Err(e) = self.content_store.set_index_status(id, status, error).await {
            warn!(item_id = %id, status = status.as_str(), "Failed to record index status: {e}");
        }
    }
}

fn index_metadata(request: &IndexRequest) -> Map<String, Value> {
    let has_media = request.content_type.is_media()
        || (request.content_type == ContentType::Campaign && request.url.is_some());
    let metadata = json!({
        "type": request.content_type.as_str(),
        "name": request.name,
        "url": request.url.clone().unwrap_or_default(),
        "category": request.category.map(|c| c.as_str()).unwrap_or("unknown"),
        "hasMedia": has_media,
    });
    match metadata {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
