use serde::{Deserialize, Serialize};
use uuid::Uuid;

use models::listing::{is_uploaded_image, DEFAULT_IMAGE_FILENAME, DEFAULT_IMAGE_URL};

use crate::asset::{StoredAsset, UploadedFile};
use crate::errors::ServiceError;

/// Embedded image reference: asset store key plus retrieval URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub filename: String,
    pub url: String,
}

impl Default for ImageRef {
    fn default() -> Self {
        Self { filename: DEFAULT_IMAGE_FILENAME.to_string(), url: DEFAULT_IMAGE_URL.to_string() }
    }
}

impl From<StoredAsset> for ImageRef {
    fn from(a: StoredAsset) -> Self { Self { filename: a.filename, url: a.url } }
}

impl ImageRef {
    /// True when the filename points at a user upload the asset store owns.
    pub fn is_uploaded(&self) -> bool { is_uploaded_image(&self.filename) }

    /// 200x200 preview used by the edit form. URLs without an `/upload`
    /// segment (the placeholder) come back unchanged.
    pub fn thumbnail_url(&self) -> String {
        self.url.replacen("/upload", "/upload/h_200,w_200", 1)
    }
}

/// Persisted listing as the service sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub location: Option<String>,
    pub country: Option<String>,
    pub image: ImageRef,
    pub owner_id: Uuid,
    pub reviews: Vec<Uuid>,
}

impl Listing {
    /// Build a new listing for `owner_id`. The image starts at the placeholder.
    pub fn new(fields: ListingFields, owner_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: fields.title,
            description: fields.description,
            price: fields.price,
            location: fields.location,
            country: fields.country,
            image: ImageRef::default(),
            owner_id,
            reviews: Vec::new(),
        }
    }

    /// Shallow merge: only fields present in the patch change.
    pub fn apply(&mut self, patch: &ListingPatch) {
        if let Some(t) = &patch.title { self.title = t.clone(); }
        if let Some(d) = &patch.description { self.description = Some(d.clone()); }
        if let Some(p) = patch.price { self.price = p; }
        if let Some(l) = &patch.location { self.location = Some(l.clone()); }
        if let Some(c) = &patch.country { self.country = Some(c.clone()); }
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        models::listing::validate_title(&self.title)?;
        models::listing::validate_price(self.price)?;
        Ok(())
    }
}

/// Client-editable listing fields. The owner is deliberately absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingFields {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Create input
#[derive(Debug, Clone)]
pub struct CreateListingInput {
    pub fields: ListingFields,
    /// Taken from the authenticated session, never from the request body.
    pub owner_id: Uuid,
    pub file: Option<UploadedFile>,
}

/// Update input
#[derive(Debug, Clone)]
pub struct UpdateListingInput {
    pub id: Uuid,
    pub patch: ListingPatch,
    pub file: Option<UploadedFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewView {
    pub id: Uuid,
    pub comment: String,
    pub rating: i16,
    pub author: Option<UserSummary>,
}

/// Listing with owner and reviews (and each review's author) resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingDetails {
    pub listing: Listing,
    pub owner: Option<UserSummary>,
    pub reviews: Vec<ReviewView>,
}

/// Payload for the edit form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditForm {
    pub listing: Listing,
    pub preview_url: String,
}
