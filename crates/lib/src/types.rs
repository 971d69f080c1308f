//! # Domain Types
//!
//! Records shared by the relational store, the indexing pipeline and the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of creative material a content item holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Image,
    Video,
    Pdf,
    Text,
    Link,
    Campaign,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Image => "image",
            ContentType::Video => "video",
            ContentType::Pdf => "pdf",
            ContentType::Text => "text",
            ContentType::Link => "link",
            ContentType::Campaign => "campaign",
        }
    }

    /// Image and video items are captioned from their media.
    pub fn is_media(&self) -> bool {
        matches!(self, ContentType::Image | ContentType::Video)
    }

    /// The media type used when captioning, if this kind carries media.
    pub fn media_type(&self) -> Option<MediaType> {
        match self {
            ContentType::Image => Some(MediaType::Image),
            ContentType::Video => Some(MediaType::Video),
            _ => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(ContentType::Image),
            "video" => Ok(ContentType::Video),
            "pdf" => Ok(ContentType::Pdf),
            "text" => Ok(ContentType::Text),
            "link" => Ok(ContentType::Link),
            "campaign" => Ok(ContentType::Campaign),
            other => Err(format!("unknown content type '{other}'")),
        }
    }
}

/// The library section a content item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Inspiration,
    ContentLibrary,
    Campaigns,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Inspiration => "inspiration",
            Category::ContentLibrary => "content-library",
            Category::Campaigns => "campaigns",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inspiration" => Ok(Category::Inspiration),
            "content-library" => Ok(Category::ContentLibrary),
            "campaigns" => Ok(Category::Campaigns),
            other => Err(format!("unknown category '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }

    /// Infers the media kind from the extension of a URL's path.
    pub fn from_url(raw: &str) -> Option<MediaType> {
        let path = match url::Url::parse(raw) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => raw.split(['?', '#']).next().unwrap_or_default().to_string(),
        };
        let (_, extension) = path.rsplit_once('.')?;
        match extension.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "avif" | "bmp" | "heic" => {
                Some(MediaType::Image)
            }
            "mp4" | "mov" | "webm" | "m4v" | "avi" | "mkv" => Some(MediaType::Video),
            _ => None,
        }
    }

    /// The MIME type assumed when the media host does not report one.
    pub fn fallback_mime(&self) -> &'static str {
        match self {
            MediaType::Image => "image/jpeg",
            MediaType::Video => "video/mp4",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            other => Err(format!("unknown media type '{other}'")),
        }
    }
}

/// Where a content item sits in the captioning and indexing lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStatus {
    Pending,
    Captioning,
    Captioned,
    Indexed,
    Skipped,
    Failed,
}

impl IndexStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexStatus::Pending => "pending",
            IndexStatus::Captioning => "captioning",
            IndexStatus::Captioned => "captioned",
            IndexStatus::Indexed => "indexed",
            IndexStatus::Skipped => "skipped",
            IndexStatus::Failed => "failed",
        }
    }
}

impl FromStr for IndexStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(IndexStatus::Pending),
            "captioning" => Ok(IndexStatus::Captioning),
            "captioned" => Ok(IndexStatus::Captioned),
            "indexed" => Ok(IndexStatus::Indexed),
            "skipped" => Ok(IndexStatus::Skipped),
            "failed" => Ok(IndexStatus::Failed),
            other => Err(format!("unknown index status '{other}'")),
        }
    }
}

/// A unit of uploaded or referenced creative material.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub category: Category,
    pub index_status: IndexStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The fields a caller supplies when creating a content item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContentItem {
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Free text for text items, or a caption the uploader already has.
    #[serde(default, alias = "summary")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignMedia {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Campaign {
    pub id: String,
    pub caption: String,
    pub media: Option<CampaignMedia>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignInput {
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub media: Option<CampaignMedia>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            other => Err(format!("unknown message role '{other}'")),
        }
    }
}

/// A persisted chat message, optionally attached to a campaign.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub campaign_id: Option<String>,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
