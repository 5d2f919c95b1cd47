use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

pub const INTERNAL_DETAIL: &str = "Failed to generate meal plan. Please try again.";

/// Error surfaced to HTTP clients as `{"detail": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Internal(e) => {
                // full detail stays in the server log
                error!(error = ?e, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_DETAIL.to_string())
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonSyntaxError(e) => ApiError::BadRequest(e.body_text()),
            other => ApiError::Unprocessable(other.body_text()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn internal_errors_hide_their_cause() {
        let (status, body) = body_of(ApiError::Internal(anyhow::anyhow!("disk on fire"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], INTERNAL_DETAIL);
    }

    #[tokio::test]
    async fn client_errors_keep_their_message() {
        let (status, body) = body_of(ApiError::BadRequest("Invalid request: x".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Invalid request: x");

        let (status, _) = body_of(ApiError::Unprocessable("missing field".into())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
