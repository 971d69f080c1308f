use super::{now_timestamp, opt_text, parse_label, parse_timestamp, text, SqliteProvider};
use crate::{
    errors::ProviderError,
    types::{Campaign, CampaignInput, CampaignMedia},
};
use turso::{params, Row};
use uuid::Uuid;

const CAMPAIGN_COLUMNS: &str =
    "id, caption, media_type, media_url, media_name, created_at, updated_at";

fn campaign_from_row(row: &Row) -> Result<Campaign, ProviderError> {
    let media = match (opt_text(row, 2)?, opt_text(row, 3)?) {
        (Some(media_type), Some(url)) => Some(CampaignMedia {
            media_type: parse_label(&media_type)?,
            url,
            name: opt_text(row, 4)?,
        }),
        _ => None,
    };
    Ok(Campaign {
        id: text(row, 0)?,
        caption: text(row, 1)?,
        media,
        created_at: parse_timestamp(&text(row, 5)?)?,
        updated_at: parse_timestamp(&text(row, 6)?)?,
    })
}

impl SqliteProvider {
    /// All campaigns, newest first.
    pub async fn list_campaigns(&self) -> Result<Vec<Campaign>, ProviderError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns ORDER BY created_at DESC"),
                (),
            )
            .await?;
        let mut campaigns = Vec::new();
        while let Some(row) = rows.next().await? {
            campaigns.push(campaign_from_row(&row)?);
        }
        Ok(campaigns)
    }

    pub async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, ProviderError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?"),
                params![id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(campaign_from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn create_campaign(&self, input: &CampaignInput) -> Result<Campaign, ProviderError> {
        let conn = self.connect()?;
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();
        let media = input.media.as_ref();
        conn.execute(
            &format!("INSERT INTO campaigns ({CAMPAIGN_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)"),
            params![
                id.as_str(),
                input.caption.as_str(),
                media.map(|m| m.media_type.as_str()),
                media.map(|m| m.url.as_str()),
                media.and_then(|m| m.name.as_deref()),
                now.as_str(),
                now.as_str()
            ],
        )
        .await?;

        self.get_campaign(&id).await?.ok_or_else(|| {
            ProviderError::StorageOperationFailed(format!("campaign {id} vanished after insert"))
        })
    }

    /// Replaces caption and media. Returns `None` if the campaign does not exist.
    pub async fn update_campaign(
        &self,
        id: &str,
        input: &CampaignInput,
    ) -> Result<Option<Campaign>, ProviderError> {
        let conn = self.connect()?;
        let media = input.media.as_ref();
        let changes = conn
            .execute(
                "UPDATE campaigns SET caption = ?, media_type = ?, media_url = ?, media_name = ?, updated_at = ? WHERE id = ?",
                params![
                    input.caption.as_str(),
                    media.map(|m| m.media_type.as_str()),
                    media.map(|m| m.url.as_str()),
                    media.and_then(|m| m.name.as_deref()),
                    now_timestamp(),
                    id
                ],
            )
            .await?;
        if changes == 0 {
            return Ok(None);
        }
        self.get_campaign(id).await
    }

    /// Deletes the campaign together with its chat history.
    pub async fn delete_campaign(&self, id: &str) -> Result<bool, ProviderError> {
        let conn = self.connect()?;
        conn.execute(
            "DELETE FROM chat_messages WHERE campaign_id = ?",
            params![id],
        )
        .await?;
        let changes = conn
            .execute("DELETE FROM campaigns WHERE id = ?", params![id])
            .await?;
        Ok(changes > 0)
    }
}
