//! Resolves a social video link to a directly downloadable file.
//!
//! TikTok links are resolved through the TikWM API. Instagram links are recognized but
//! not supported.

use crate::errors::ProviderError;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_TIKWM_API_URL: &str = "https://www.tikwm.com/api/";
const TIKWM_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("URL is required")]
    MissingUrl,
    #[error("Only Instagram and TikTok URLs are supported")]
    Unsupported,
    #[error("Instagram video download is currently unavailable. Please try uploading the video directly.")]
    InstagramUnavailable,
    #[error("Failed to download TikTok video")]
    TikTokFailed,
    #[error("Failed to download video")]
    Transport(#[source] ProviderError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedVideo {
    pub success: bool,
    pub video_url: String,
    pub thumbnail: String,
    pub filename: String,
}

#[derive(Deserialize, Debug)]
struct TikWmResponse {
    #[serde(default = "unknown_code")]
    code: i64,
    #[serde(default)]
    data: Option<TikWmVideo>,
}

fn unknown_code() -> i64 {
    -1
}

#[derive(Deserialize, Debug)]
struct TikWmVideo {
    #[serde(default)]
    play: Option<String>,
    #[serde(default)]
    cover: Option<String>,
}

#[derive(Clone, Debug)]
pub struct VideoDownloader {
    client: ReqwestClient,
    tikwm_api_url: String,
}

impl VideoDownloader {
    pub fn new(tikwm_api_url: String) -> Result<Self, ProviderError> {
        let client = ReqwestClient::builder()
            .timeout(TIKWM_TIMEOUT)
            .build()
            .map_err(ProviderError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            tikwm_api_url,
        })
    }

    pub async fn resolve_video_link(&self, url: &str) -> Result<ResolvedVideo, DownloadError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(DownloadError::MissingUrl);
        }
        let is_instagram = url.contains("instagram.com");
        let is_tiktok = url.contains("tiktok.com");
        if !is_instagram && !is_tiktok {
            return Err(DownloadError::Unsupported);
        }
        if is_instagram {
            return Err(DownloadError::InstagramUnavailable);
        }

        let response = self
            .client
            .get(&self.tikwm_api_url)
            .query(&[("url", url)])
            .send()
            .await
            .map_err(|source| {
                DownloadError::Transport(ProviderError::ServiceRequest {
                    service: "TikWM",
                    source,
                })
            })?;
        let body: TikWmResponse = response.json().await.map_err(|source| {
            DownloadError::Transport(ProviderError::ServiceRequest {
                service: "TikWM",
                source,
            })
        })?;

        let video = body.data.filter(|_| body.code == 0);
        let Some((play, cover)) = video.and_then(|v| {
            let play = v.play.filter(|p| !p.is_empty())?;
            Some((play, v.cover.unwrap_or_default()))
        }) else {
            warn!(code = body.code, "TikWM did not return a playable video");
            return Err(DownloadError::TikTokFailed);
        };

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        info!("Resolved TikTok video link");
        Ok(ResolvedVideo {
            success: true,
            video_url: play,
            thumbnail: cover,
            filename: format!("video_{millis}.mp4"),
        })
    }
}
