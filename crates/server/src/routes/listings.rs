use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use common::types::Notice;
use service::{
    asset::AssetStore,
    listing::{
        domain::{CreateListingInput, EditForm, Listing, ListingDetails, ListingFields, ListingPatch, UpdateListingInput},
        repository::{ListingRepository, ReviewCollection},
    },
    ListingService,
};

use crate::errors::JsonApiError;
use crate::extract::{CurrentUser, ListingForm};

pub const MISSING_LISTING: &str = "Listing you requested for does not exist!";
pub const LISTING_NOT_FOUND: &str = "Listing not found!";

pub struct ServerState<R: ListingRepository, A: AssetStore, C: ReviewCollection<R::Tx>> {
    pub listings: Arc<ListingService<R, A, C>>,
}

impl<R: ListingRepository, A: AssetStore, C: ReviewCollection<R::Tx>> Clone for ServerState<R, A, C> {
    fn clone(&self) -> Self { Self { listings: Arc::clone(&self.listings) } }
}

#[derive(Serialize)]
pub struct ListingResponse {
    pub notice: Notice,
    pub listing: Listing,
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub notice: Notice,
    pub id: Uuid,
}

/// Listing routes; form bodies (image included) are capped at `max_upload_bytes`.
pub fn router<R, A, C>(max_upload_bytes: usize) -> Router<ServerState<R, A, C>>
where
    R: ListingRepository + 'static,
    A: AssetStore + 'static,
    C: ReviewCollection<R::Tx> + 'static,
{
    Router::new()
        .route("/listings", get(list::<R, A, C>).post(create::<R, A, C>))
        .route("/listings/:id", get(show::<R, A, C>).put(update::<R, A, C>).delete(destroy::<R, A, C>))
        .route("/listings/:id/edit", get(edit::<R, A, C>))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

pub async fn list<R: ListingRepository, A: AssetStore, C: ReviewCollection<R::Tx>>(
    State(state): State<ServerState<R, A, C>>,
) -> Result<Json<Vec<Listing>>, JsonApiError> {
    let all = state.listings.list().await.map_err(|e| JsonApiError::from_service(e, MISSING_LISTING))?;
    info!(count = all.len(), "list listings");
    Ok(Json(all))
}

pub async fn show<R: ListingRepository, A: AssetStore, C: ReviewCollection<R::Tx>>(
    State(state): State<ServerState<R, A, C>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ListingDetails>, JsonApiError> {
    state.listings.get(id).await.map(Json).map_err(|e| JsonApiError::from_service(e, MISSING_LISTING))
}

pub async fn edit<R: ListingRepository, A: AssetStore, C: ReviewCollection<R::Tx>>(
    State(state): State<ServerState<R, A, C>>,
    Path(id): Path<Uuid>,
) -> Result<Json<EditForm>, JsonApiError> {
    state.listings.edit_form(id).await.map(Json).map_err(|e| JsonApiError::from_service(e, MISSING_LISTING))
}

pub async fn create<R: ListingRepository, A: AssetStore, C: ReviewCollection<R::Tx>>(
    State(state): State<ServerState<R, A, C>>,
    CurrentUser(owner_id): CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ListingResponse>), JsonApiError> {
    let form = ListingForm::<ListingFields>::read(multipart).await?;
    let input = CreateListingInput { fields: form.listing, owner_id, file: form.image };
    let listing = state.listings.create(input).await.map_err(|e| JsonApiError::from_service(e, LISTING_NOT_FOUND))?;
    Ok((StatusCode::CREATED, Json(ListingResponse { notice: Notice::success("New Listing Created!"), listing })))
}

pub async fn update<R: ListingRepository, A: AssetStore, C: ReviewCollection<R::Tx>>(
    State(state): State<ServerState<R, A, C>>,
    Path(id): Path<Uuid>,
    _user: CurrentUser,
    multipart: Multipart,
) -> Result<Json<ListingResponse>, JsonApiError> {
    let form = ListingForm::<ListingPatch>::read(multipart).await?;
    let input = UpdateListingInput { id, patch: form.listing, file: form.image };
    let listing = state.listings.update(input).await.map_err(|e| JsonApiError::from_service(e, LISTING_NOT_FOUND))?;
    Ok(Json(ListingResponse { notice: Notice::success("Listing Updated!"), listing }))
}

pub async fn destroy<R: ListingRepository, A: AssetStore, C: ReviewCollection<R::Tx>>(
    State(state): State<ServerState<R, A, C>>,
    Path(id): Path<Uuid>,
    _user: CurrentUser,
) -> Result<Json<DeletedResponse>, JsonApiError> {
    let id = state.listings.delete(id).await.map_err(|e| JsonApiError::from_service(e, LISTING_NOT_FOUND))?;
    Ok(Json(DeletedResponse { notice: Notice::success("Listing Deleted!"), id }))
}
