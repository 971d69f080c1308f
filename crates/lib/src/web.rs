//! Web search and page scraping through the BrightData tools endpoint.

use crate::errors::ProviderError;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{error, info};

pub const DEFAULT_BRIGHTDATA_API_URL: &str = "https://mcp.brightdata.com/api/tools/call";
pub const DEFAULT_MAX_RESULTS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub success: bool,
    pub results: Value,
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub success: bool,
    pub markdown: Value,
    pub url: String,
    pub metadata: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeOptions {
    pub include_links: bool,
    pub include_images: bool,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            include_links: true,
            include_images: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BrightDataClient {
    client: ReqwestClient,
    api_url: String,
    token: Option<String>,
}

impl BrightDataClient {
    pub fn new(api_url: String, token: Option<String>) -> Result<Self, ProviderError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(ProviderError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url,
            token,
        })
    }

    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value, ProviderError> {
        let token = self
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ProviderError::MissingApiKey("BrightData"))?;

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(token)
            .json(&json!({ "tool": tool, "arguments": arguments }))
            .send()
            .await
            .map_err(|source| ProviderError::ServiceRequest {
                service: "BrightData",
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%tool, %status, "BrightData tool call failed: {body}");
            return Err(ProviderError::ServiceApi {
                service: "BrightData",
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|source| ProviderError::ServiceRequest {
                service: "BrightData",
                source,
            })
    }

    pub async fn search(&self, query: &str, max_results: u32) -> Result<SearchResults, ProviderError> {
        let data = self
            .call_tool(
                "search_engine",
                json!({ "query": query, "max_results": max_results }),
            )
            .await?;
        info!(%query, "BrightData search completed");
        let results = match data.get("results") {
            Some(results) if !results.is_null() => results.clone(),
            _ => data,
        };
        Ok(SearchResults {
            success: true,
            results,
            query: query.to_string(),
        })
    }

    /// Fetches `url` as markdown. The URL must be absolute.
    pub async fn scrape(&self, url: &str, options: ScrapeOptions) -> Result<ScrapedPage, ProviderError> {
        url::Url::parse(url).map_err(|_| ProviderError::InvalidUrl(url.to_string()))?;

        let data = self
            .call_tool(
                "scrape_as_markdown",
                json!({
                    "url": url,
                    "include_links": options.include_links,
                    "include_images": options.include_images,
                }),
            )
            .await?;
        info!(%url, "BrightData scrape completed");

        let field = |key: &str| data.get(key).filter(|v| truthy_content(v)).cloned();
        let markdown = field("content")
            .or_else(|| field("markdown"))
            .unwrap_or_else(|| data.clone());
        let metadata = field("metadata").unwrap_or_else(|| Value::Object(Map::new()));
        Ok(ScrapedPage {
            success: true,
            markdown,
            url: url.to_string(),
            metadata,
        })
    }
}

fn truthy_content(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
