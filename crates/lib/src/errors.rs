use thiserror::Error;

/// Errors raised by the outbound collaborators (AI providers, storage, HTTP services).
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Failed to send request to AI provider: {0}")]
    AiRequest(reqwest::Error),
    #[error("Failed to deserialize AI provider response: {0}")]
    AiDeserialization(reqwest::Error),
    #[error("AI provider returned an error: {0}")]
    AiApi(String),
    #[error("Request to {service} failed: {source}")]
    ServiceRequest {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} returned status {status}: {body}")]
    ServiceApi {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("API key for {0} is missing")]
    MissingApiKey(&'static str),
    #[error("Storage provider connection error: {0}")]
    StorageConnection(String),
    #[error("Storage operation failed: {0}")]
    StorageOperationFailed(String),
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

impl From<turso::Error> for ProviderError {
    fn from(err: turso::Error) -> Self {
        ProviderError::StorageOperationFailed(err.to_string())
    }
}
