//! # Ad Intelligence
//!
//! Backend library for a marketing-campaign workspace: a content library whose items are
//! captioned and indexed for semantic search, campaigns edited with an AI assistant, and
//! the research, posting and download helpers around them.
//!
//! The HTTP surface lives in the `adintel-server` crate; everything here is transport-free.

pub mod chat;
pub mod download;
pub mod errors;
pub mod indexing;
pub mod prompts;
pub mod providers;
pub mod research;
pub mod social;
pub mod types;
pub mod web;

pub use errors::ProviderError;
pub use indexing::{
    IndexError, IndexJob, IndexQueue, IndexReport, IndexRequest, IndexingPipeline, JobStatus,
    JobStore, PipelineSettings, QueueSettings,
};
pub use providers::db::sqlite::SqliteProvider;
