//! # Competitor Research
//!
//! Asks Claude to research a competitor query with live web search and normalizes the
//! loosely structured JSON it returns into a [`CompetitorAnalysis`].

use crate::{
    errors::ProviderError,
    prompts::research::{
        competitor_user_prompt, COMPETITOR_SYSTEM_PROMPT, WEB_SEARCH_TOOL_DESCRIPTION,
    },
    providers::ai::anthropic::{DEFAULT_ANTHROPIC_API_URL, DEFAULT_ANTHROPIC_VERSION},
};
use chrono::{SecondsFormat, Utc};
use regex::Regex;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, warn};

pub const DEFAULT_RESEARCH_MODEL: &str = "claude-4-5-sonnet-20241022";
pub const DEFAULT_RESEARCH_MAX_TOKENS: u32 = 1600;
const MAX_INSIGHTS: usize = 6;
const MAX_TREND_POINTS: usize = 12;
const MAX_REGIONS: usize = 10;
const DEFAULT_GEO: &str = "us";
const DEFAULT_DATE_RANGE: &str = "last-12-months";
const DEFAULT_WIDGETS: &str = "interest_over_time,geo_map";
const MISSING_TRENDS: &str = "BrightData service did not return trend data.";

#[derive(Error, Debug)]
pub enum ResearchError {
    #[error("Competitor analysis query is required.")]
    EmptyQuery,
    #[error("{0}")]
    Service(String),
    #[error("Failed to build research client: {0}")]
    Client(#[from] ProviderError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchInsight {
    pub title: String,
    pub snippet: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionInterest {
    pub region: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendsRequest {
    pub query: String,
    pub geo: String,
    pub date_range: String,
    pub widgets: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleTrendsSummary {
    pub success: bool,
    pub request: TrendsRequest,
    pub interest_over_time: Vec<TrendPoint>,
    pub top_regions: Vec<RegionInterest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorAnalysis {
    pub query: String,
    pub search_insights: Vec<SearchInsight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_raw: Option<Value>,
    pub google_trends: GoogleTrendsSummary,
}

/// The data part streamed to the chat client after an `!analysis` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorAnalysisEvent {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<CompetitorAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub generated_at: String,
    pub duration_ms: u64,
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct ResearchSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub api_version: String,
    pub model: String,
    pub max_tokens: u32,
    /// Sent as `anthropic-beta` on the first attempt when set.
    pub web_search_beta: Option<String>,
    pub web_search: bool,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_ANTHROPIC_API_URL.to_string(),
            api_key: None,
            api_version: DEFAULT_ANTHROPIC_VERSION.to_string(),
            model: DEFAULT_RESEARCH_MODEL.to_string(),
            max_tokens: DEFAULT_RESEARCH_MAX_TOKENS,
            web_search_beta: None,
            web_search: true,
        }
    }
}

struct Attempt {
    label: &'static str,
    beta: Option<String>,
    with_tools: bool,
    allow_tool_fallback: bool,
}

#[derive(Deserialize, Debug)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize, Debug)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Clone, Debug)]
pub struct CompetitorResearch {
    client: ReqwestClient,
    settings: ResearchSettings,
}

impl CompetitorResearch {
    pub fn new(settings: ResearchSettings) -> Result<Self, ResearchError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(ProviderError::ReqwestClientBuild)?;
        Ok(Self { client, settings })
    }

    /// Researches `query` and returns the normalized analysis.
    pub async fn analyze(&self, query: &str) -> Result<CompetitorAnalysis, ResearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResearchError::EmptyQuery);
        }
        let payload = self.call_with_fallbacks(query).await.map_err(|raw| {
            error!("Competitor research failed: {raw}");
            ResearchError::Service(friendly_error(&raw))
        })?;
        Ok(normalize_payload(query, payload))
    }

    /// Runs [`Self::analyze`] and packages the outcome, success or failure, as a stream event.
    pub async fn analysis_event(&self, query: &str) -> CompetitorAnalysisEvent {
        let started = Instant::now();
        let (payload, error) = match self.analyze(query).await {
            Ok(payload) => (Some(payload), None),
            Err(e) => (None, Some(e.to_string())),
        };
        CompetitorAnalysisEvent {
            query: query.to_string(),
            payload,
            error,
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            duration_ms: started.elapsed().as_millis() as u64,
            source: "brightdata".to_string(),
        }
    }

    fn attempts(&self) -> Vec<Attempt> {
        let beta = self
            .settings
            .web_search_beta
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string);
        let mut attempts = Vec::new();
        if self.settings.web_search {
            attempts.push(Attempt {
                label: if beta.is_some() {
                    "web-search-with-beta"
                } else {
                    "web-search"
                },
                beta: beta.clone(),
                with_tools: true,
                allow_tool_fallback: true,
            });
            if beta.is_some() {
                attempts.push(Attempt {
                    label: "web-search-no-beta",
                    beta: None,
                    with_tools: true,
                    allow_tool_fallback: true,
                });
            }
        }
        attempts.push(Attempt {
            label: "baseline",
            beta: None,
            with_tools: false,
            allow_tool_fallback: false,
        });
        attempts
    }

    fn request_body(&self, query: &str, with_tools: bool) -> Value {
        let mut body = json!({
            "system": COMPETITOR_SYSTEM_PROMPT,
            "model": self.settings.model,
            "max_tokens": self.settings.max_tokens,
            "temperature": 0,
            "messages": [{
                "role": "user",
                "content": [{"type": "text", "text": competitor_user_prompt(query)}],
            }],
        });
        if with_tools {
            body["tools"] = json!([{
                "type": "web_search",
                "name": "web_search",
                "description": WEB_SEARCH_TOOL_DESCRIPTION,
            }]);
            body["tool_choice"] = json!("auto");
        }
        body
    }

    /// Tries each attempt in order; every failure moves on to the next one.
    async fn call_with_fallbacks(&self, query: &str) -> Result<Map<String, Value>, String> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ProviderError::MissingApiKey("Anthropic").to_string())?;

        let mut last_error = String::from("Web search failed for all attempts.");
        for attempt in self.attempts() {
            match self.call_once(api_key, query, &attempt).await {
                Ok(payload) => {
                    if attempt.label != "baseline" {
                        info!(attempt = attempt.label, "Research attempt succeeded");
                    }
                    return Ok(payload);
                }
                Err(AttemptFailure::Rejected { message, body }) => {
                    let lowered = body.to_lowercase();
                    let tool_rejection = lowered.contains("anthropic-beta")
                        || lowered.contains("web_search")
                        || lowered.contains("tool");
                    if attempt.allow_tool_fallback && tool_rejection {
                        warn!(attempt = attempt.label, "Research attempt rejected; retrying without web search tools");
                    } else {
                        error!(attempt = attempt.label, "Research attempt failed: {message}");
                    }
                    last_error = message;
                }
                Err(AttemptFailure::Other(message)) => {
                    error!(attempt = attempt.label, "Research attempt failed: {message}");
                    last_error = message;
                }
            }
        }
        Err(last_error)
    }

    async fn call_once(
        &self,
        api_key: &str,
        query: &str,
        attempt: &Attempt,
    ) -> Result<Map<String, Value>, AttemptFailure> {
        let mut request = self
            .client
            .post(&self.settings.api_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", &self.settings.api_version)
            .json(&self.request_body(query, attempt.with_tools));
        if let Some(beta) = &attempt.beta {
            request = request.header("anthropic-beta", beta);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AttemptFailure::Other(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = if body.is_empty() { "unknown error" } else { &body };
            return Err(AttemptFailure::Rejected {
                message: format!("Web search request failed ({status}): {detail}"),
                body,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AttemptFailure::Other(e.to_string()))?;
        let text = first_text_block(&parsed.content);
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(AttemptFailure::Other(
                "Web search returned an unexpected payload shape.".to_string(),
            )),
        }
    }
}

enum AttemptFailure {
    Rejected { message: String, body: String },
    Other(String),
}

fn first_text_block(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter(|b| b.block_type == "text")
        .filter_map(|b| b.text.as_deref().map(str::trim))
        .find(|t| !t.is_empty())
        .map(strip_code_fence)
        .unwrap_or_default()
}

fn strip_code_fence(payload: &str) -> String {
    let fenced = Regex::new(r"(?i)^```(?:json)?\s*([\s\S]*?)\s*```$")
        .ok()
        .and_then(|re| re.captures(payload).and_then(|c| c.get(1)))
        .map(|m| m.as_str().trim().to_string());
    fenced.unwrap_or_else(|| payload.to_string())
}

/// Turns a raw failure into the message shown to the user, keeping the HTTP status if known.
pub fn friendly_error(raw: &str) -> String {
    let status = Regex::new(r"\((\d{3}[^)]*)\)")
        .ok()
        .and_then(|re| re.captures(raw).and_then(|c| c.get(1)))
        .map(|m| m.as_str().trim().to_string());
    match status {
        Some(status) => {
            format!("BrightData service request failed ({status}). Please try again later.")
        }
        None => "BrightData service request failed. Please try again later.".to_string(),
    }
}

fn coerce_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn coerce_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn infer_source(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

fn objects(value: Option<&Value>) -> impl Iterator<Item = &Map<String, Value>> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

pub fn normalize_payload(query: &str, payload: Map<String, Value>) -> CompetitorAnalysis {
    let search_insights = normalize_insights(payload.get("searchInsights"));
    let google_trends = normalize_trends(payload.get("googleTrends"), query);
    let query = coerce_string(payload.get("query")).unwrap_or_else(|| query.to_string());
    let search_raw = match payload.get("searchRaw") {
        Some(raw) if !raw.is_null() => raw.clone(),
        _ => Value::Object(payload),
    };
    CompetitorAnalysis {
        query,
        search_insights,
        search_raw: Some(search_raw),
        google_trends,
    }
}

fn normalize_insights(value: Option<&Value>) -> Vec<SearchInsight> {
    let mut seen = HashSet::new();
    objects(value)
        .filter_map(|item| {
            let title = coerce_string(item.get("title"))
                .or_else(|| coerce_string(item.get("snippet")))
                .unwrap_or_else(|| "Untitled insight".to_string());
            let url = coerce_string(item.get("url"))?;
            if !seen.insert(format!("{title}-{url}")) {
                return None;
            }
            let source = coerce_string(item.get("source")).or_else(|| infer_source(&url));
            Some(SearchInsight {
                title,
                snippet: coerce_string(item.get("snippet")).unwrap_or_default(),
                source,
                published_at: coerce_string(item.get("publishedAt")),
                url,
            })
        })
        .take(MAX_INSIGHTS)
        .collect()
}

fn empty_trends(query: &str, error: &str) -> GoogleTrendsSummary {
    GoogleTrendsSummary {
        success: false,
        request: TrendsRequest {
            query: query.to_string(),
            geo: DEFAULT_GEO.to_string(),
            date_range: DEFAULT_DATE_RANGE.to_string(),
            widgets: DEFAULT_WIDGETS.to_string(),
        },
        interest_over_time: Vec::new(),
        top_regions: Vec::new(),
        raw_excerpt: None,
        error: Some(error.to_string()),
    }
}

fn normalize_trends(value: Option<&Value>, query: &str) -> GoogleTrendsSummary {
    let Some(data) = value.and_then(Value::as_object) else {
        return empty_trends(query, MISSING_TRENDS);
    };
    let request = data.get("request").and_then(Value::as_object);
    let field = |key: &str| request.and_then(|r| coerce_string(r.get(key)));

    let mut points: Vec<TrendPoint> = objects(data.get("interestOverTime"))
        .filter_map(|item| {
            let label = coerce_string(item.get("label"))
                .or_else(|| coerce_string(item.get("time")))
                .or_else(|| coerce_string(item.get("formattedTime")))?;
            let value = coerce_number(item.get("value"))?;
            Some(TrendPoint {
                label,
                value: value.clamp(0.0, 100.0),
            })
        })
        .collect();
    if points.len() > MAX_TREND_POINTS {
        points.drain(..points.len() - MAX_TREND_POINTS);
    }

    let regions: Vec<RegionInterest> = objects(data.get("topRegions"))
        .filter_map(|item| {
            let region = ["region", "geoName", "location", "country"]
                .iter()
                .find_map(|key| coerce_string(item.get(*key)))?;
            let value = coerce_number(item.get("value"))?;
            Some(RegionInterest {
                region,
                value: value.clamp(0.0, 100.0),
            })
        })
        .take(MAX_REGIONS)
        .collect();

    let has_data = !points.is_empty() || !regions.is_empty();
    let success = match data.get("success") {
        Some(Value::Null) | None => has_data,
        Some(Value::Bool(b)) => *b,
        Some(other) => truthy(other),
    };

    GoogleTrendsSummary {
        success,
        request: TrendsRequest {
            query: field("query").unwrap_or_else(|| query.to_string()),
            geo: field("geo").unwrap_or_else(|| DEFAULT_GEO.to_string()),
            date_range: field("dateRange").unwrap_or_else(|| DEFAULT_DATE_RANGE.to_string()),
            widgets: field("widgets").unwrap_or_else(|| DEFAULT_WIDGETS.to_string()),
        },
        interest_over_time: points,
        top_regions: regions,
        raw_excerpt: coerce_string(data.get("rawExcerpt")),
        error: coerce_string(data.get("error")),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn insights_are_deduplicated_capped_and_sourced() {
        let mut items: Vec<Value> = (0..8)
            .map(|i| json!({"title": format!("T{i}"), "url": format!("https://www.site{i}.com/a")}))
            .collect();
        items.insert(1, json!({"title": "T0", "url": "https://www.site0.com/a"}));
        items.insert(0, json!({"title": "no url"}));
        items.push(json!({"snippet": "only snippet", "url": "https://x.io"}));

        let insights = normalize_insights(Some(&Value::Array(items)));
        assert_eq!(insights.len(), 6);
        assert_eq!(insights[0].title, "T0");
        assert_eq!(insights[0].source.as_deref(), Some("site0.com"));
        assert_eq!(insights[1].title, "T1");
    }

    #[test]
    fn insight_title_falls_back_to_snippet_then_placeholder() {
        let items = json!([
            {"snippet": "A snippet", "url": "https://a.com"},
            {"url": "https://b.com", "source": "Custom"}
        ]);
        let insights = normalize_insights(Some(&items));
        assert_eq!(insights[0].title, "A snippet");
        assert_eq!(insights[1].title, "Untitled insight");
        assert_eq!(insights[1].source.as_deref(), Some("Custom"));
    }

    #[test]
    fn trend_points_are_clamped_and_keep_the_last_twelve() {
        let points: Vec<Value> = (0..15)
            .map(|i| json!({"time": format!("w{i}"), "value": (i * 10).to_string()}))
            .collect();
        let trends = normalize_trends(
            Some(&json!({
                "interestOverTime": points,
                "topRegions": [{"geoName": "Texas", "value": -5}, {"value": 3}],
            })),
            "acme",
        );
        assert!(trends.success);
        assert_eq!(trends.interest_over_time.len(), 12);
        assert_eq!(trends.interest_over_time[0].label, "w3");
        assert_eq!(trends.interest_over_time[11].value, 100.0);
        assert_eq!(trends.top_regions.len(), 1);
        assert_eq!(trends.top_regions[0].value, 0.0);
        assert_eq!(trends.request.geo, "us");
        assert_eq!(trends.request.query, "acme");
    }

    #[test]
    fn missing_trends_yield_an_unsuccessful_summary() {
        let trends = normalize_trends(Some(&json!("nope")), "acme");
        assert!(!trends.success);
        assert_eq!(trends.error.as_deref(), Some(MISSING_TRENDS));
        assert_eq!(trends.request.widgets, "interest_over_time,geo_map");

        let empty = normalize_trends(Some(&json!({})), "acme");
        assert!(!empty.success);
        assert!(empty.error.is_none());
    }

    #[test]
    fn payload_query_and_raw_fall_back() {
        let analysis = normalize_payload("acme", object(json!({"searchInsights": []})));
        assert_eq!(analysis.query, "acme");
        assert_eq!(analysis.search_raw, Some(json!({"searchInsights": []})));

        let analysis = normalize_payload(
            "acme",
            object(json!({"query": "Acme Corp", "searchRaw": {"n": 1}})),
        );
        assert_eq!(analysis.query, "Acme Corp");
        assert_eq!(analysis.search_raw, Some(json!({"n": 1})));
    }

    #[test]
    fn code_fences_are_stripped() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn friendly_error_keeps_the_status() {
        assert_eq!(
            friendly_error("Web search request failed (529 Overloaded): busy"),
            "BrightData service request failed (529 Overloaded). Please try again later."
        );
        assert_eq!(
            friendly_error("connection reset"),
            "BrightData service request failed. Please try again later."
        );
    }
}
