//! # Common Test Utilities
//!
//! This module centralizes the test harness used across the `adintel-server`
//! integration tests:
//!
//! - `TestApp`: A full application harness that spawns a real server on a random port,
//!   configured so that every outbound collaborator (Gemini, Anthropic, embeddings,
//!   Composio, BrightData, TikWM, Supabase Storage) points at one `httpmock::MockServer`.
//! - Helpers for programming the common collaborator mocks and for waiting on
//!   background indexing jobs.

// Allow unused code because this is a test utility module, and not all
// functions might be used by every test file that includes it.
#![allow(unused)]

use adintel_server::{
    config, router,
    state::{build_app_state, AppState},
};
use anyhow::{anyhow, Result};
use axum::serve;
use httpmock::{Method::POST, Mock, MockServer};
use reqwest::Client;
use serde_json::{json, Value};
use std::{fs::File, io::Write, net::SocketAddr, path::PathBuf, time::Duration};
use tempfile::{tempdir, NamedTempFile, TempDir};
use tokio::{net::TcpListener, task::JoinHandle};

pub const GEMINI_BASE: &str = "/gemini/v1beta";
pub const CAPTION_PATH: &str = "/gemini/v1beta/models/gemini-2.5-flash:generateContent";
pub const EMBEDDINGS_PATH: &str = "/v1/embeddings";
pub const ANTHROPIC_PATH: &str = "/anthropic/v1/messages";
pub const COMPOSIO_BASE: &str = "/composio/api/v3";
pub const BRIGHTDATA_PATH: &str = "/brightdata/api/tools/call";
pub const TIKWM_PATH: &str = "/tikwm/api/";
pub const SUPABASE_BASE: &str = "/supabase";

// --- Full Application Test Harness ---

/// A harness for end-to-end testing of the Axum server.
///
/// This struct spawns the server on a random available port over a temporary
/// SQLite database file, with every collaborator URL pointing at `mock_server`.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub mock_server: MockServer,
    pub db_path: PathBuf,
    pub app_state: AppState,
    _db_file: NamedTempFile,
    _config_dir: TempDir,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestApp {
    /// Spawns the application server and returns a `TestApp` instance.
    ///
    /// Embeddings are always mocked: every text embeds to the same vector.
    pub async fn spawn() -> Result<Self> {
        dotenvy::dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .try_init();

        let mock_server = MockServer::start();
        mock_server.mock(|when, then| {
            when.method(POST).path(EMBEDDINGS_PATH);
            then.status(200)
                .json_body(json!({ "data": [{ "embedding": [0.1, 0.2, 0.3, 0.4] }] }));
        });

        let db_file = NamedTempFile::new()?;
        let db_path = db_file.path().to_path_buf();
        let db_url = db_path
            .to_str()
            .ok_or_else(|| anyhow!("temp db path is not valid UTF-8"))?
            .to_string();

        let config_dir = tempdir()?;
        let config_path = config_dir.path().join("config.yml");
        let config_content = format!(
            r#"
port: 0
db_url: "{db_url}"
gemini:
  api_base: "{gemini}"
  api_key: "test-gemini-key"
  caption_model: "gemini-2.5-flash"
anthropic:
  api_url: "{anthropic}"
  api_key: "test-anthropic-key"
groq:
  api_url: "{groq}"
  api_key: "test-groq-key"
embedding:
  api_url: "{embeddings}"
  model_name: "mock-embedding-model"
  api_key: "test-embedding-key"
media_store:
  url: "{supabase}"
  api_key: "test-supabase-key"
brightdata:
  api_url: "{brightdata}"
  token: "test-brightdata-token"
composio:
  api_url: "{composio}"
  api_key: "test-composio-key"
tiktok:
  api_url: "{tikwm}"
indexing:
  max_attempts: 2
  retry_delay_ms: 20
  concurrency: 2
"#,
            gemini = mock_server.url(GEMINI_BASE),
            anthropic = mock_server.url(ANTHROPIC_PATH),
            groq = mock_server.url("/groq/openai/v1/chat/completions"),
            embeddings = mock_server.url(EMBEDDINGS_PATH),
            supabase = mock_server.url(SUPABASE_BASE),
            brightdata = mock_server.url(BRIGHTDATA_PATH),
            composio = mock_server.url(COMPOSIO_BASE),
            tikwm = mock_server.url(TIKWM_PATH),
        );
        let mut file = File::create(&config_path)?;
        file.write_all(config_content.as_bytes())?;

        let config_path = config_path
            .to_str()
            .ok_or_else(|| anyhow!("config path is not valid UTF-8"))?;
        let config = config::get_config(Some(config_path))?;
        let app_state = build_app_state(config).await?;
        let app_state_for_harness = app_state.clone();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let address = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server_handle = tokio::spawn(async move {
            let app = router::create_router(app_state);
            let server = serve(listener, app).with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!("[TestApp] Server error: {}", e);
            }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;

        Ok(Self {
            address,
            client: Client::new(),
            mock_server,
            db_path,
            app_state: app_state_for_harness,
            _db_file: db_file,
            _config_dir: config_dir,
            _server_handle: server_handle,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Serves a small fake media file at `path` on the mock server and returns its URL.
    pub fn mock_media(&self, path: &str) -> String {
        self.mock_server.mock(|when, then| {
            when.method(httpmock::Method::GET).path(path);
            then.status(200)
                .header("content-type", "image/png")
                .body(vec![0x89, b'P', b'N', b'G']);
        });
        self.mock_server.url(path)
    }

    /// Makes the Gemini captioning endpoint answer with `caption`.
    pub fn mock_caption(&self, caption: &str) -> Mock<'_> {
        self.mock_server.mock(|when, then| {
            when.method(POST).path(CAPTION_PATH);
            then.status(200).json_body(json!({
                "candidates": [{ "content": { "parts": [{ "text": caption }] } }]
            }));
        })
    }

    /// Polls the job endpoint until the job is `done` or `failed`.
    pub async fn wait_for_job(&self, job_id: &str) -> Result<Value> {
        for _ in 0..100 {
            let job: Value = self
                .client
                .get(self.url(&format!("/index/jobs/{job_id}")))
                .send()
                .await?
                .json()
                .await?;
            let status = job["result"]["status"].as_str().unwrap_or_default();
            if status == "done" || status == "failed" {
                return Ok(job["result"].clone());
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        Err(anyhow!("job {job_id} did not finish in time"))
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Parses a server-sent event body into the JSON chunks of its `data:` lines.
pub fn sse_chunks(body: &str) -> Vec<Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .filter(|data| *data != "[DONE]")
        .filter_map(|data| serde_json::from_str(data).ok())
        .collect()
}
