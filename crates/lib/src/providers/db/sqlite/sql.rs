//! # SQLite Schema
//!
//! Table definitions for the relational store, the vector index and the indexing job log.
//! Every statement is idempotent so the list can run on each startup.

pub const CREATE_CONTENT_ITEMS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS content_items (
        id TEXT PRIMARY KEY,
        category TEXT NOT NULL,
        type TEXT NOT NULL,
        name TEXT NOT NULL,
        url TEXT,
        thumbnail TEXT,
        summary TEXT,
        index_status TEXT NOT NULL DEFAULT 'pending',
        index_error TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )";

pub const CREATE_CONTENT_ITEMS_CATEGORY_INDEX: &str = "
    CREATE INDEX IF NOT EXISTS idx_content_items_category
    ON content_items (category, created_at)";

pub const CREATE_CAMPAIGNS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS campaigns (
        id TEXT PRIMARY KEY,
        caption TEXT NOT NULL,
        media_type TEXT,
        media_url TEXT,
        media_name TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )";

pub const CREATE_CHAT_MESSAGES_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS chat_messages (
        id TEXT PRIMARY KEY,
        campaign_id TEXT,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL
    )";

pub const CREATE_CHAT_MESSAGES_CAMPAIGN_INDEX: &str = "
    CREATE INDEX IF NOT EXISTS idx_chat_messages_campaign
    ON chat_messages (campaign_id, created_at)";

pub const CREATE_INDEX_JOBS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS index_jobs (
        id TEXT PRIMARY KEY,
        item_id TEXT NOT NULL,
        request TEXT NOT NULL,
        status TEXT NOT NULL,
        attempts INTEGER NOT NULL DEFAULT 0,
        max_attempts INTEGER NOT NULL,
        last_error TEXT,
        outcome TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )";

pub const CREATE_INDEX_JOBS_STATUS_INDEX: &str = "
    CREATE INDEX IF NOT EXISTS idx_index_jobs_status
    ON index_jobs (status, created_at)";

pub const CREATE_VECTOR_COLLECTIONS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS vector_collections (
        name TEXT PRIMARY KEY,
        metadata TEXT,
        created_at TEXT NOT NULL
    )";

/// One row per `(collection, id)`; the primary key is what makes inserts idempotent.
pub const CREATE_VECTOR_DOCUMENTS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS vector_documents (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        document TEXT NOT NULL,
        metadata TEXT,
        embedding BLOB,
        created_at TEXT NOT NULL,
        PRIMARY KEY (collection, id)
    )";

pub const ALL_TABLE_CREATION_SQL: &[&str] = &[
    CREATE_CONTENT_ITEMS_TABLE,
    CREATE_CONTENT_ITEMS_CATEGORY_INDEX,
    CREATE_CAMPAIGNS_TABLE,
    CREATE_CHAT_MESSAGES_TABLE,
    CREATE_CHAT_MESSAGES_CAMPAIGN_INDEX,
    CREATE_INDEX_JOBS_TABLE,
    CREATE_INDEX_JOBS_STATUS_INDEX,
    CREATE_VECTOR_COLLECTIONS_TABLE,
    CREATE_VECTOR_DOCUMENTS_TABLE,
];
