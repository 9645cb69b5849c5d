use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use talkoot_types::api::ErrorBody;

/// Request-level failures, mapped onto the response status they produce.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Invalid form input; the message is shown to the user.
    #[error("{0}")]
    BadRequest(String),

    /// No session, or the session cookie does not resolve.
    #[error("authentication required")]
    Unauthorized,

    /// CSRF mismatch, non-owner access, or an unknown classification pair.
    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    /// Store-level uniqueness conflict (duplicate username).
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(e) => {
                error!("internal error: {:#}", e);
                // Opaque body; details stay in the log.
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: "internal server error".to_string(),
                    }),
                )
                    .into_response();
            }
        };

        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Run a blocking database closure off the async runtime.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task join error: {}", e)))?
        .map_err(ApiError::from)
}
