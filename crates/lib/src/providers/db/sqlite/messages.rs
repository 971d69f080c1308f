use super::{now_timestamp, opt_text, parse_label, parse_timestamp, text, SqliteProvider};
use crate::{
    errors::ProviderError,
    types::{ChatMessage, MessageRole},
};
use turso::{params, Row};
use uuid::Uuid;

const MESSAGE_COLUMNS: &str = "id, campaign_id, role, content, created_at";

fn message_from_row(row: &Row) -> Result<ChatMessage, ProviderError> {
    Ok(ChatMessage {
        id: text(row, 0)?,
        campaign_id: opt_text(row, 1)?,
        role: parse_label(&text(row, 2)?)?,
        content: text(row, 3)?,
        created_at: parse_timestamp(&text(row, 4)?)?,
    })
}

impl SqliteProvider {
    /// Chat history in conversation order. `None` selects messages outside any campaign.
    pub async fn list_chat_messages(
        &self,
        campaign_id: Option<&str>,
    ) -> Result<Vec<ChatMessage>, ProviderError> {
        let conn = self.connect()?;
        let mut rows = match campaign_id {
            Some(campaign_id) => {
                conn.query(
                    &format!(
                        "SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE campaign_id = ? ORDER BY created_at ASC, rowid ASC"
                    ),
                    params![campaign_id],
                )
                .await?
            }
            None => {
                conn.query(
                    &format!(
                        "SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE campaign_id IS NULL ORDER BY created_at ASC, rowid ASC"
                    ),
                    (),
                )
                .await?
            }
        };

        let mut messages = Vec::new();
        while let Some(row) = rows.next().await? {
            messages.push(message_from_row(&row)?);
        }
        Ok(messages)
    }

    pub async fn create_chat_message(
        &self,
        campaign_id: Option<&str>,
        role: MessageRole,
        content: &str,
    ) -> Result<ChatMessage, ProviderError> {
        let conn = self.connect()?;
        let id = Uuid::new_v4().to_string();
        let created_at = now_timestamp();
        conn.execute(
            &format!("INSERT INTO chat_messages ({MESSAGE_COLUMNS}) VALUES (?, ?, ?, ?, ?)"),
            params![
                id.as_str(),
                campaign_id,
                role.as_str(),
                content,
                created_at.as_str()
            ],
        )
        .await?;

        Ok(ChatMessage {
            id,
            campaign_id: campaign_id.map(str::to_string),
            role,
            content: content.to_string(),
            created_at: parse_timestamp(&created_at)?,
        })
    }

    /// Appends several messages in order, e.g. a user turn and the assistant reply.
    pub async fn create_chat_messages(
        &self,
        campaign_id: Option<&str>,
        messages: &[(MessageRole, String)],
    ) -> Result<Vec<ChatMessage>, ProviderError> {
        let mut created = Vec::with_capacity(messages.len());
        for (role, content) in messages {
            created.push(self.create_chat_message(campaign_id, *role, content).await?);
        }
        Ok(created)
    }

    /// Returns the number of messages removed.
    pub async fn delete_chat_messages(&self, campaign_id: &str) -> Result<u64, ProviderError> {
        let conn = self.connect()?;
        let changes = conn
            .execute(
                "DELETE FROM chat_messages WHERE campaign_id = ?",
                params![campaign_id],
            )
            .await?;
        Ok(changes)
    }
}
