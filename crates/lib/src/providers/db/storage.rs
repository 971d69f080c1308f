use crate::errors::ProviderError;
use crate::types::{ContentItem, IndexStatus};
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

/// The slice of the relational store the indexing pipeline writes to.
#[async_trait]
pub trait ContentStore: Send + Sync + DynClone + Debug {
    /// Stores a generated summary. Returns `None` when no item has this id.
    async fn update_content_summary(
        &self,
        id: &str,
        summary: &str,
    ) -> Result<Option<ContentItem>, ProviderError>;

    /// Records the item's position in the indexing lifecycle.
    async fn set_index_status(
        &self,
        id: &str,
        status: IndexStatus,
        error: Option<&str>,
    ) -> Result<(), ProviderError>;
}

dyn_clone::clone_trait_object!(ContentStore);
