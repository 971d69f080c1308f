//! # Vector Index
//!
//! Named collections of text documents with metadata, searchable by embedding similarity.
//! The index enforces at most one document per `(collection, id)`.

mod sqlite;

pub use sqlite::SqliteVectorIndex;

use crate::errors::ProviderError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dyn_clone::DynClone;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Debug;

/// A document offered to the index. Documents without an id get a generated one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewDocument {
    #[serde(default)]
    pub id: Option<String>,
    pub document: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub document: String,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryMatch {
    pub id: String,
    pub document: String,
    pub metadata: Map<String, Value>,
    /// Cosine similarity to the query text; absent for an empty query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// The matches for one query text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    pub query: String,
    pub matches: Vec<QueryMatch>,
}

/// Outcome of an insert: duplicates are counted, never raised.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddResult {
    pub added: usize,
    pub skipped: usize,
    /// Ids of the documents actually inserted.
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub document_count: i64,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait VectorIndex: Send + Sync + Debug + DynClone {
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, ProviderError>;

    /// Fails with `AlreadyExists` if the name is taken.
    async fn create_collection(
        &self,
        name: &str,
        metadata: Option<Value>,
    ) -> Result<CollectionInfo, ProviderError>;

    async fn get_collection(&self, name: &str) -> Result<Option<CollectionInfo>, ProviderError>;

    /// Removes the collection and its documents. Returns `false` if it did not exist.
    async fn delete_collection(&self, name: &str) -> Result<bool, ProviderError>;

    async fn document_exists(&self, collection: &str, id: &str) -> Result<bool, ProviderError>;

    /// Inserts each document unless its id is already present in the collection.
    ///
    /// The collection is created on demand.
    async fn add_documents(
        &self,
        collection: &str,
        documents: Vec<NewDocument>,
    ) -> Result<AddResult, ProviderError>;

    /// Runs one similarity search per query text, filtered by flat metadata equality.
    async fn query(
        &self,
        collection: &str,
        query_texts: &[String],
        n_results: usize,
        filter: Option<&Map<String, Value>>,
    ) -> Result<Vec<QueryResult>, ProviderError>;

    async fn get_documents(&self, collection: &str) -> Result<Vec<StoredDocument>, ProviderError>;

    async fn delete_document(&self, collection: &str, id: &str) -> Result<bool, ProviderError>;
}

dyn_clone::clone_trait_object!(VectorIndex);
