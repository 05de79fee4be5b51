use dotenvy::dotenv;
use tracing::{error, info};
use uuid::Uuid;

fn init_logging() {
    // load .env first so RUST_LOG / LOG_FORMAT take effect
    dotenv().ok();
    common::utils::logging::init_logging_from_env();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(service = "wanderlust", event = "signal_failed", error = %e, "could not listen for Ctrl+C");
        return;
    }
    info!(service = "wanderlust", event = "shutdown_signal", "received Ctrl+C, draining connections");
}

fn main() -> std::process::ExitCode {
    init_logging();

    let service_id = Uuid::new_v4();
    let pid = std::process::id();

    std::panic::set_hook(Box::new(move |info| {
        error!(service = "wanderlust", event = "panic", %service_id, pid, message = %info, "unhandled panic occurred");
    }));

    let cfg = match server::load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(service = "wanderlust", event = "config_invalid", error = %e, "refusing to start");
            return std::process::ExitCode::FAILURE;
        }
    };

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(w) = cfg.server.worker_threads { builder.worker_threads(w); }
    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "wanderlust", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(
        service = "wanderlust",
        event = "start",
        %service_id,
        pid,
        version = env!("CARGO_PKG_VERSION"),
        threads = cfg.server.worker_threads.unwrap_or_default(),
        db_pool = cfg.database.max_connections,
        cloud = %cfg.asset_store.cloud_name,
        folder = %cfg.asset_store.folder,
        max_upload_bytes = cfg.asset_store.max_upload_bytes,
        "listing service starting"
    );

    match rt.block_on(server::run(cfg, shutdown_signal())) {
        Ok(()) => {
            info!(service = "wanderlust", event = "stop", %service_id, pid, "listing service stopped");
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            error!(service = "wanderlust", event = "run_failed", error = %e, "listing service exited with error");
            std::process::ExitCode::FAILURE
        }
    }
}
