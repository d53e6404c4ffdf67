use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use tripbi_types::api::{ErrorBody, ErrorDetail};

pub type ApiResult<T> = Result<T, ApiError>;

/// Error taxonomy for the REST surface. Every handler failure maps to one of
/// these; the body is always `{"error": {"code", "message"}}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Expired(String),

    #[error("{0}")]
    Unavailable(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Expired(_) => StatusCode::GONE,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Expired(_) => "expired",
            Self::Unavailable(_) => "unavailable",
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Internal details stay in the logs, not the response body
        let message = match &self {
            Self::Internal(e) => {
                error!("internal error: {:#}", e);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
            },
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<tripbi_core::status::InvalidTransition> for ApiError {
    fn from(e: tripbi_core::status::InvalidTransition) -> Self {
        Self::Validation(e.to_string())
    }
}

/// Run blocking database work off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("spawn_blocking join error: {e}")))?
}

impl From<tripbi_core::validation::ProofRejection> for ApiError {
    fn from(e: tripbi_core::validation::ProofRejection) -> Self {
        Self::Validation(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Expired("gone".into()).status(),
            StatusCode::GONE
        );
        assert_eq!(
            ApiError::Unavailable("not configured").status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_internal_message_is_opaque() {
        let err = ApiError::Internal(anyhow::anyhow!("secret db path /var/lib/x"));
        assert_eq!(err.code(), "internal");
    }

    #[test]
    fn test_invalid_transition_is_a_validation_error() {
        use tripbi_types::models::ProposalStatus::{Decided, Proposed};
        let err: ApiError = tripbi_core::status::transition(Decided, Proposed)
            .unwrap_err()
            .into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "validation");
    }

    #[tokio::test]
    async fn test_blocking_propagates_both_arms() {
        let ok: super::ApiResult<u32> = blocking(|| Ok(7)).await;
        assert_eq!(ok.unwrap(), 7);

        let err: super::ApiResult<u32> = blocking(|| Err(ApiError::Unauthorized)).await;
        assert!(matches!(err, Err(ApiError::Unauthorized)));
    }
}
