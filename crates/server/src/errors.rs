use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use service::errors::ServiceError;
use thiserror::Error;
use tracing::{error, warn};

/// JSON error body: `{ "error": <user notice>, "detail": <cause>, "code": <n> }`.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<String>,
    pub code: Option<u16>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, message: &str, detail: Option<String>) -> Self {
        Self { status, message: message.to_string(), detail, code: None }
    }

    /// Map a service failure, using `not_found` as the user-facing notice for missing listings.
    pub fn from_service(e: ServiceError, not_found: &str) -> Self {
        let code = Some(e.code());
        let (status, message) = match &e {
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, not_found),
            ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation Error"),
            ServiceError::AssetStore(_) => (StatusCode::BAD_GATEWAY, "Image Upload Failed"),
            ServiceError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
        };
        Self { status, message: message.to_string(), detail: Some(e.to_string()), code }
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, detail = ?self.detail, "request failed");
        } else {
            warn!(status = %self.status, detail = ?self.detail, "request rejected");
        }
        let mut body = serde_json::json!({ "error": self.message });
        if let Some(d) = self.detail { body["detail"] = serde_json::Value::String(d); }
        if let Some(c) = self.code { body["code"] = serde_json::Value::from(c); }
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
