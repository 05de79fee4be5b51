//! Request extractors for the listing routes.

use axum::{
    async_trait,
    extract::{multipart::MultipartError, FromRequestParts, Multipart},
    http::{request::Parts, StatusCode},
};
use serde::de::DeserializeOwned;
use service::asset::UploadedFile;
use uuid::Uuid;

use crate::errors::JsonApiError;

/// Header set by the upstream authentication layer once the session is verified.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated user id. Never read from the request body.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Uuid);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = JsonApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| JsonApiError::new(StatusCode::UNAUTHORIZED, "You must be logged in", None))?;
        let id = Uuid::parse_str(raw.trim())
            .map_err(|e| JsonApiError::new(StatusCode::UNAUTHORIZED, "You must be logged in", Some(e.to_string())))?;
        Ok(CurrentUser(id))
    }
}

/// Listing form: a `listing` JSON part plus an optional `image` file part.
pub struct ListingForm<T> {
    pub listing: T,
    pub image: Option<UploadedFile>,
}

/// Oversized bodies surface as 413; anything else is a malformed form.
fn form_error(e: MultipartError) -> JsonApiError {
    let status = e.status();
    let message = if status == StatusCode::PAYLOAD_TOO_LARGE { "Image Too Large" } else { "Invalid Form" };
    JsonApiError::new(status, message, Some(e.body_text()))
}

impl<T: DeserializeOwned> ListingForm<T> {
    pub async fn read(mut multipart: Multipart) -> Result<Self, JsonApiError> {
        let bad = |msg: &str, e: String| JsonApiError::new(StatusCode::BAD_REQUEST, msg, Some(e));
        let mut listing: Option<T> = None;
        let mut image = None;
        while let Some(field) = multipart.next_field().await.map_err(form_error)? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("listing") => {
                    let text = field.text().await.map_err(form_error)?;
                    listing = Some(serde_json::from_str(&text).map_err(|e| bad("Validation Error", e.to_string()))?);
                }
                Some("image") => {
                    let original_name = field.file_name().unwrap_or("upload").to_string();
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(form_error)?;
                    // browsers send an empty part when no file was picked
                    if !bytes.is_empty() {
                        image = Some(UploadedFile { original_name, content_type, bytes: bytes.to_vec() });
                    }
                }
                _ => {}
            }
        }
        let listing = listing.ok_or_else(|| bad("Validation Error", "missing listing field".into()))?;
        Ok(Self { listing, image })
    }
}
