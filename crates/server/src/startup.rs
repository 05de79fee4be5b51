use std::{future::Future, net::SocketAddr, path::Path, sync::Arc};

use axum::Router;
use migration::MigratorTrait;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes;
use configs::AppConfig;
use service::{
    asset::CloudinaryStore,
    listing::repo::seaorm::{SeaOrmListingRepository, SeaOrmReviewCollection},
    ListingService,
};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Load the config file when one exists, otherwise build from the environment.
///
/// A file that exists but fails to parse or validate is an error; it is never
/// silently replaced by environment defaults.
pub fn load_config() -> Result<AppConfig, StartupError> {
    let path = configs::config_path();
    if !Path::new(&path).exists() {
        warn!(%path, "no config file; building config from environment");
        return AppConfig::from_env().map_err(|e| StartupError::InvalidConfig(e.to_string()));
    }
    AppConfig::load_and_validate().map_err(|e| StartupError::InvalidConfig(format!("{path}: {e}")))
}

/// Build the app and serve until `shutdown` resolves.
pub async fn run(cfg: AppConfig, shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
    common::env::ensure_env("public").await?;

    // DB connection
    let db = models::db::connect_with_config(&cfg.database).await?;
    migration::Migrator::up(&db, None).await?;
    info!("migrations applied");

    let repo = Arc::new(SeaOrmListingRepository { db });
    let reviews = Arc::new(SeaOrmReviewCollection);
    let assets = Arc::new(CloudinaryStore::new(cfg.asset_store.clone())?);
    let listings = Arc::new(ListingService::new(repo, assets, reviews));

    let app: Router = routes::build_router(listings, build_cors(), cfg.asset_store.max_upload_bytes);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    info!("server drained");
    Ok(())
}
