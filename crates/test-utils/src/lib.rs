use adintel::errors::ProviderError;
use adintel::indexing::{IndexingPipeline, PipelineSettings};
use adintel::providers::ai::{AiProvider, Captioner, ChatTurn, Embedder, TurnRole};
use adintel::providers::vector::SqliteVectorIndex;
use adintel::types::MediaType;
use adintel::SqliteProvider;
use adintel::chat::{ChatModels, ModelChoice};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use turso::Database;

// --- Test Setup ---

/// A helper struct to manage database creation for each test.
pub struct TestSetup {
    pub db: Database,
    pub store: SqliteProvider,
}

impl TestSetup {
    /// Creates a new, isolated in-memory database and initializes the schema.
    pub async fn new() -> Result<Self> {
        let db = turso::Builder::new_local(":memory:").build().await?;
        let conn = db.connect()?;

        // Initialize the schema using the shared SQL constants.
        for statement in adintel::providers::db::sqlite::sql::ALL_TABLE_CREATION_SQL {
            conn.execute(statement, ()).await?;
        }

        let store = SqliteProvider::from_database(db.clone());
        Ok(Self { db, store })
    }

    /// A vector index over this database, embedding with [`MockEmbedder`].
    pub fn vector_index(&self) -> SqliteVectorIndex {
        SqliteVectorIndex::new(self.db.clone(), Box::new(MockEmbedder::default()))
    }

    /// A pipeline wired to this database and the given captioner.
    pub fn pipeline(&self, captioner: MockCaptioner) -> IndexingPipeline {
        IndexingPipeline::new(
            Box::new(captioner),
            Box::new(self.store.clone()),
            Box::new(self.vector_index()),
            PipelineSettings::default(),
        )
    }
}

// --- Mock AI Provider ---

#[derive(Clone, Debug)]
pub struct MockAiProvider {
    responses: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockAiProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Pre-programs a response for a specific prompt.
    /// The key should be a unique substring of the system prompt.
    pub fn add_response(&self, key: &str, response: &str) {
        let mut responses = self.responses.lock().unwrap();
        responses.insert(key.to_string(), response.to_string());
    }

    /// Retrieves the recorded calls as (system prompt, last user turn) pairs.
    pub fn get_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockAiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn chat(&self, system_prompt: &str, turns: &[ChatTurn]) -> Result<String, ProviderError> {
        let last_user = turns
            .iter()
            .rev()
            .find(|t| t.role == TurnRole::User)
            .map(|t| t.content.clone())
            .unwrap_or_default();
        self.calls
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), last_user));

        let responses = self.responses.lock().unwrap();
        for (key, response) in responses.iter() {
            if system_prompt.contains(key) {
                return Ok(response.clone());
            }
        }

        Err(ProviderError::AiApi(format!(
            "MockAiProvider: No response programmed for system prompt. Got: '{system_prompt}'"
        )))
    }
}

/// Hands out the same [`MockAiProvider`] for every model and records which were asked for.
#[derive(Clone, Debug, Default)]
pub struct MockChatModels {
    pub provider: MockAiProvider,
    choices: Arc<Mutex<Vec<ModelChoice>>>,
}

impl MockChatModels {
    pub fn new(provider: MockAiProvider) -> Self {
        Self {
            provider,
            choices: Arc::default(),
        }
    }

    pub fn choices(&self) -> Vec<ModelChoice> {
        self.choices.lock().unwrap().clone()
    }
}

impl ChatModels for MockChatModels {
    fn provider_for(&self, choice: ModelChoice) -> Result<Box<dyn AiProvider>, ProviderError> {
        self.choices.lock().unwrap().push(choice);
        Ok(Box::new(self.provider.clone()))
    }
}

// --- Mock Captioner ---

/// A captioner that replays scripted outcomes, then repeats a default caption.
#[derive(Clone, Debug)]
pub struct MockCaptioner {
    default_caption: String,
    script: Arc<Mutex<VecDeque<Result<String, String>>>>,
    calls: Arc<Mutex<Vec<(String, MediaType)>>>,
}

impl MockCaptioner {
    pub fn new(default_caption: &str) -> Self {
        Self {
            default_caption: default_caption.to_string(),
            script: Arc::default(),
            calls: Arc::default(),
        }
    }

    /// Makes the next call fail with `message`.
    pub fn fail_next(&self, message: &str) -> &Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    /// Makes the next call return `caption`.
    pub fn respond_next(&self, caption: &str) -> &Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(caption.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<(String, MediaType)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockCaptioner {
    fn default() -> Self {
        Self::new("A bright product photo of a reusable water bottle on a beach towel")
    }
}

#[async_trait]
impl Captioner for MockCaptioner {
    async fn caption(
        &self,
        url: &str,
        media_type: MediaType,
        _name: Option<&str>,
    ) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), media_type));
        let scripted = self.script.lock().unwrap().pop_front();
        match scripted {
            Some(Ok(caption)) => Ok(caption),
            Some(Err(message)) => Err(ProviderError::AiApi(message)),
            None => Ok(self.default_caption.clone()),
        }
    }
}

// --- Mock Embedder ---

const MOCK_DIMENSIONS: usize = 64;

/// Deterministic bag-of-words embeddings: texts sharing words score as similar.
#[derive(Clone, Debug, Default)]
pub struct MockEmbedder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockEmbedder {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn fnv1a(word: &str) -> u64 {
    word.bytes().fold(0xcbf29ce484222325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x100000001b3)
    })
}

pub fn mock_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; MOCK_DIMENSIONS];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let slot = (fnv1a(&word.to_lowercase()) % MOCK_DIMENSIONS as u64) as usize;
        vector[slot] += 1.0;
    }
    vector
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.calls.lock().unwrap().push(text.to_string());
        Ok(mock_embedding(text))
    }
}
