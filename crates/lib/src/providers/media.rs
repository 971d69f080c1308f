//! # Object / Media Store
//!
//! Binary uploads are handed to Supabase Storage, which returns a stable public URL.

use crate::errors::ProviderError;
use async_trait::async_trait;
use dyn_clone::DynClone;
use reqwest::Client as ReqwestClient;
use std::fmt::Debug;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};
use uuid::Uuid;

pub const DEFAULT_BUCKET: &str = "content-library";

#[async_trait]
pub trait MediaStore: Send + Sync + Debug + DynClone {
    /// Stores the bytes under a fresh unique name and returns their public URL.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        content_type: &str,
        bucket: Option<&str>,
    ) -> Result<String, ProviderError>;

    /// Removes an object, addressed by its public URL or its path inside the bucket.
    async fn delete(&self, url_or_path: &str, bucket: Option<&str>) -> Result<(), ProviderError>;

    /// Whether `url` is a public URL this store handed out.
    fn manages(&self, url: &str) -> bool;
}

dyn_clone::clone_trait_object!(MediaStore);

#[derive(Clone, Debug)]
pub struct SupabaseStorage {
    client: ReqwestClient,
    base_url: Option<String>,
    api_key: Option<String>,
    default_bucket: String,
}

impl SupabaseStorage {
    pub fn new(
        base_url: Option<String>,
        api_key: Option<String>,
        default_bucket: String,
    ) -> Result<Self, ProviderError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(ProviderError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
            api_key,
            default_bucket,
        })
    }

    fn credentials(&self) -> Result<(&str, &str), ProviderError> {
        let base_url = self
            .base_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(ProviderError::MissingApiKey("Supabase URL"))?;
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ProviderError::MissingApiKey("Supabase"))?;
        Ok((base_url, api_key))
    }

    /// The public URL of an object.
    pub fn public_url(base_url: &str, bucket: &str, path: &str) -> String {
        format!("{base_url}/storage/v1/object/public/{bucket}/{path}")
    }
}

/// Builds `<unix-millis>-<random>.<ext>`, keeping the original extension.
pub fn unique_object_name(file_name: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let random: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && !ext.contains('/') => {
            format!("{millis}-{random}.{}", ext.to_lowercase())
        }
        _ => format!("{millis}-{random}"),
    }
}

#[async_trait]
impl MediaStore for SupabaseStorage {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        content_type: &str,
        bucket: Option<&str>,
    ) -> Result<String, ProviderError> {
        let (base_url, api_key) = self.credentials()?;
        let bucket = bucket.unwrap_or(&self.default_bucket);
        let object_name = unique_object_name(file_name);

        let response = self
            .client
            .post(format!("{base_url}/storage/v1/object/{bucket}/{object_name}"))
            .bearer_auth(api_key)
            .header("apikey", api_key)
            .header("x-upsert", "false")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|source| ProviderError::ServiceRequest {
                service: "Supabase Storage",
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ServiceApi {
                service: "Supabase Storage",
                status: status.as_u16(),
                body,
            });
        }

        info!(%bucket, %object_name, "Uploaded media object");
        Ok(Self::public_url(base_url, bucket, &object_name))
    }

    async fn delete(&self, url_or_path: &str, bucket: Option<&str>) -> Result<(), ProviderError> {
        let (base_url, api_key) = self.credentials()?;
        let public_root = format!("{base_url}/storage/v1/object/public/");
        let (bucket, path) = match (bucket, url_or_path.strip_prefix(&public_root)) {
            (Some(bucket), Some(rest)) => (
                bucket.to_string(),
                rest.strip_prefix(&format!("{bucket}/")).unwrap_or(rest).to_string(),
            ),
            (None, Some(rest)) => match rest.split_once('/') {
                Some((bucket, path)) => (bucket.to_string(), path.to_string()),
                None => (self.default_bucket.clone(), rest.to_string()),
            },
            (bucket, None) => (
                bucket.unwrap_or(&self.default_bucket).to_string(),
                url_or_path.to_string(),
            ),
        };

        let response = self
            .client
            .delete(format!("{base_url}/storage/v1/object/{bucket}/{path}"))
            .bearer_auth(api_key)
            .header("apikey", api_key)
            .send()
            .await
            .map_err(|source| ProviderError::ServiceRequest {
                service: "Supabase Storage",
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%path, %status, "Failed to delete media object");
            return Err(ProviderError::ServiceApi {
                service: "Supabase Storage",
                status: status.as_u16(),
                body,
            });
        }
        info!(%bucket, %path, "Deleted media object");
        Ok(())
    }

    fn manages(&self, url: &str) -> bool {
        self.base_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .is_some_and(|base| url.starts_with(&format!("{base}/storage/v1/object/public/")))
    }
}
