use super::{now_timestamp, opt_text, parse_label, parse_timestamp, text, SqliteProvider};
use crate::{
    errors::ProviderError,
    providers::db::storage::ContentStore,
    types::{Category, ContentItem, IndexStatus, NewContentItem},
};
use async_trait::async_trait;
use tracing::debug;
use turso::{params, Row};
use uuid::Uuid;

const CONTENT_COLUMNS: &str = "id, type, name, url, thumbnail, summary, category, index_status, index_error, created_at, updated_at";

fn content_item_from_row(row: &Row) -> Result<ContentItem, ProviderError> {
    Ok(ContentItem {
        id: text(row, 0)?,
        content_type: parse_label(&text(row, 1)?)?,
        name: text(row, 2)?,
        url: opt_text(row, 3)?,
        thumbnail: opt_text(row, 4)?,
        summary: opt_text(row, 5)?,
        category: parse_label(&text(row, 6)?)?,
        index_status: parse_label(&text(row, 7)?)?,
        index_error: opt_text(row, 8)?,
        created_at: parse_timestamp(&text(row, 9)?)?,
        updated_at: parse_timestamp(&text(row, 10)?)?,
    })
}

impl SqliteProvider {
    /// Inserts a new content item in `pending` index state.
    pub async fn create_content_item(
        &self,
        item: &NewContentItem,
        category: Category,
    ) -> Result<ContentItem, ProviderError> {
        let conn = self.connect()?;
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();
        let summary = item
            .text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        conn.execute(
            &format!(
                "INSERT INTO content_items ({CONTENT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?)"
            ),
            params![
                id.as_str(),
                item.content_type.as_str(),
                item.name.as_str(),
                item.url.as_deref(),
                item.thumbnail.as_deref(),
                summary,
                category.as_str(),
                IndexStatus::Pending.as_str(),
                now.as_str(),
                now.as_str()
            ],
        )
        .await?;

        debug!(item_id = %id, %category, "Created content item");
        self.get_content_item(&id).await?.ok_or_else(|| {
            ProviderError::StorageOperationFailed(format!("content item {id} vanished after insert"))
        })
    }

    pub async fn get_content_item(&self, id: &str) -> Result<Option<ContentItem>, ProviderError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!("SELECT {CONTENT_COLUMNS} FROM content_items WHERE id = ?"),
                params![id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(content_item_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Lists items newest first, optionally restricted to one category.
    pub async fn list_content_items(
        &self,
        category: Option<Category>,
    ) -> Result<Vec<ContentItem>, ProviderError> {
        let conn = self.connect()?;
        let mut rows = match category {
            Some(category) => {
                conn.query(
                    &format!(
                        "SELECT {CONTENT_COLUMNS} FROM content_items WHERE category = ? ORDER BY created_at DESC"
                    ),
                    params![category.as_str()],
                )
                .await?
            }
            None => {
                conn.query(
                    &format!("SELECT {CONTENT_COLUMNS} FROM content_items ORDER BY created_at DESC"),
                    (),
                )
                .await?
            }
        };

        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(content_item_from_row(&row)?);
        }
        Ok(items)
    }

    /// Returns `true` when a row was removed.
    pub async fn delete_content_item(&self, id: &str) -> Result<bool, ProviderError> {
        let conn = self.connect()?;
        let changes = conn
            .execute("DELETE FROM content_items WHERE id = ?", params![id])
            .await?;
        Ok(changes > 0)
    }
}

#[async_trait]
impl ContentStore for SqliteProvider {
    async fn update_content_summary(
        &self,
        id: &str,
        summary: &str,
    ) -> Result<Option<ContentItem>, ProviderError> {
        let conn = self.connect()?;
        let changes = conn
            .execute(
                "UPDATE content_items SET summary = ?, updated_at = ? WHERE id = ?",
                params![summary, now_timestamp(), id],
            )
            .await?;
        if changes == 0 {
            return Ok(None);
        }
        self.get_content_item(id).await
    }

    async fn set_index_status(
        &self,
        id: &str,
        status: IndexStatus,
        error: Option<&str>,
    ) -> Result<(), ProviderError> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE content_items SET index_status = ?, index_error = ?, updated_at = ? WHERE id = ?",
            params![status.as_str(), error, now_timestamp(), id],
        )
        .await?;
        Ok(())
    }
}
