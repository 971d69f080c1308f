use adintel::{download::DownloadError, research::ResearchError, IndexError, ProviderError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

/// A custom error type for the server application.
///
/// This enum encapsulates different kinds of errors that can occur within the server,
/// allowing them to be converted into appropriate HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// A request failed validation. The message is returned to the client verbatim.
    BadRequest(String),
    NotFound(String),
    /// Errors raised by an outbound collaborator or the local store.
    Provider(ProviderError),
    Index(IndexError),
    Research(ResearchError),
    Download(DownloadError),
    /// Generic internal server errors.
    Internal(anyhow::Error),
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        AppError::Provider(err)
    }
}

impl From<IndexError> for AppError {
    fn from(err: IndexError) -> Self {
        AppError::Index(err)
    }
}

impl From<ResearchError> for AppError {
    fn from(err: ResearchError) -> Self {
        AppError::Research(err)
    }
}

impl From<DownloadError> for AppError {
    fn from(err: DownloadError) -> Self {
        AppError::Download(err)
    }
}

/// Conversion from `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

fn provider_status(err: &ProviderError) -> StatusCode {
    match err {
        ProviderError::NotFound(_) => StatusCode::NOT_FOUND,
        ProviderError::AlreadyExists(_) => StatusCode::CONFLICT,
        ProviderError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
        ProviderError::StorageConnection(_)
        | ProviderError::StorageOperationFailed(_)
        | ProviderError::JsonSerialization(_)
        | ProviderError::ReqwestClientBuild(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ProviderError::MissingApiKey(_)
        | ProviderError::AiRequest(_)
        | ProviderError::AiDeserialization(_)
        | ProviderError::AiApi(_)
        | ProviderError::ServiceRequest { .. }
        | ProviderError::ServiceApi { .. } => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Provider(err) => {
                // Log the original error for debugging purposes
                error!("ProviderError: {:?}", err);
                (provider_status(&err), err.to_string())
            }
            AppError::Index(err) => {
                error!("IndexError: {:?}", err);
                let status = match &err {
                    IndexError::JobStore(inner) => provider_status(inner),
                    IndexError::VectorIndex(_) | IndexError::Captioning { .. } => {
                        StatusCode::BAD_GATEWAY
                    }
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
            AppError::Research(err) => {
                error!("ResearchError: {:?}", err);
                let status = match err {
                    ResearchError::EmptyQuery => StatusCode::BAD_REQUEST,
                    ResearchError::Service(_) => StatusCode::BAD_GATEWAY,
                    ResearchError::Client(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
            AppError::Download(err) => {
                warn!("DownloadError: {:?}", err);
                let status = match err {
                    DownloadError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, err.to_string())
            }
            AppError::Internal(err) => {
                error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status_code, body).into_response()
    }
}
