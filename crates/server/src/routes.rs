pub mod listings;

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;
use service::{
    asset::AssetStore,
    listing::repository::{ListingRepository, ReviewCollection},
    ListingService,
};

pub use listings::ServerState;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Build the full application router around a listing service.
pub fn build_router<R, A, C>(listings: Arc<ListingService<R, A, C>>, cors: CorsLayer, max_upload_bytes: usize) -> Router
where
    R: ListingRepository + 'static,
    A: AssetStore + 'static,
    C: ReviewCollection<R::Tx> + 'static,
{
    let state = ServerState { listings };

    Router::new()
        .route("/health", get(health))
        .merge(listings::router(max_upload_bytes))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
