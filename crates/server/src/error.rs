use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use incident_core::CoreError;
use thiserror::Error;

/// Errors that can occur while running the incident console server, wrapping
/// every domain error plus the handful of transport-level failures specific
/// to the HTTP layer.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error encountered at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A domain-level error surfaced through the API.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A multipart upload was missing a required field or carried an
    /// unsupported content type.
    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    /// The referenced resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Self::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            Self::InvalidUpload(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Core(err) => match err {
                CoreError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                CoreError::UpstreamError(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
                CoreError::NotConfigured(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                CoreError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            },
        };

        (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn bad_request_core_error_maps_to_400() {
        let response = ServerError::Core(CoreError::bad_request("missing field")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "missing field");
    }

    #[tokio::test]
    async fn upstream_error_maps_to_502() {
        let response = ServerError::Core(CoreError::upstream("prometheus unreachable")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn not_found_maps_to_404() {
        let response = ServerError::NotFound("recipient 123".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
