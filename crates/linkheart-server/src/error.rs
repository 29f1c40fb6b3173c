use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use linkheart_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A store task panicked or was cancelled.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Store(err) => match err {
                StoreError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
                StoreError::NotAParticipant(_) => (StatusCode::FORBIDDEN, self.to_string()),
                StoreError::MatchNotFound(_) | StoreError::UserNotFound(_) => {
                    (StatusCode::NOT_FOUND, self.to_string())
                }
                StoreError::Conflict { .. } => (StatusCode::CONFLICT, self.to_string()),
                StoreError::StorageCorrupt { .. } => {
                    tracing::error!(error = %err, "storage corrupt");
                    (StatusCode::INTERNAL_SERVER_ERROR, "Storage is corrupt".to_string())
                }
                _ => {
                    tracing::error!(error = %err, "store failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
            },
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ServerError::Internal(detail) => {
                tracing::error!(error = %detail, "store task failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
