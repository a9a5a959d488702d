use axum::extract::rejection::StringRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use lambda_http::tracing;
use thiserror::Error;

use crate::codec::CodecError;
use crate::store::StoreError;

/// Faults that escape the visit handler.
///
/// Business misses (unknown site, site already exists) never end up here;
/// they are rendered as `{"code":"Error"}` bodies by the dispatcher.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ServerError {
    #[error("Store error: {0}")]
    Store(String),
    #[error("Codec error: {0}")]
    Codec(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Deserialize error: {0}")]
    DeserializeError(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match self {
            ServerError::Store(err) => {
                tracing::error!(error = %err, "store fault");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Store error: {err}"),
                )
            }
            ServerError::Codec(err) => {
                tracing::error!(error = %err, "codec fault");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Codec error: {err}"),
                )
            }
            ServerError::Configuration(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Configuration error: {err}"),
            ),
            ServerError::DeserializeError(err) => {
                (StatusCode::BAD_REQUEST, format!("Deserialize error: {err}"))
            }
        };
        (status, Json(error_message)).into_response()
    }
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        ServerError::Store(err.to_string())
    }
}

impl From<CodecError> for ServerError {
    fn from(err: CodecError) -> Self {
        ServerError::Codec(err.to_string())
    }
}

impl From<StringRejection> for ServerError {
    fn from(rejection: StringRejection) -> Self {
        ServerError::DeserializeError(rejection.to_string())
    }
}
