use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use configs::{AppConfig, StorageConfig};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::routes::{self, AppState};
use service::{errors::ServiceError, metrics, Cache, CacheService, DurableBackend, DurableStore};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Load the durable table, warm the cache from it and build the router.
///
/// Any failure here is a startup failure: the caller must not serve.
pub async fn build_app(storage: &StorageConfig) -> anyhow::Result<(Router, Arc<DurableStore>)> {
    common::env::ensure_data_dir(&storage.path).await?;

    let durable = DurableStore::load(storage.path.clone(), storage.sync_writes)
        .await
        .map_err(ServiceError::Startup)?;
    let cache = Arc::new(Cache::warm(durable.snapshot().await));
    info!(
        path = %storage.path.display(),
        entries = cache.len().await,
        sync_writes = storage.sync_writes,
        "cache warmed from durable store"
    );

    metrics::init();
    let service = CacheService::new(cache, Arc::clone(&durable) as Arc<dyn DurableBackend>);
    let app = routes::build_router(AppState { service }, build_cors());
    Ok((app, durable))
}

/// Public entry: build the app, serve until Ctrl+C, then release the backing file.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let (app, durable) = build_app(&cfg.storage).await?;

    let addr: SocketAddr = cfg.bind_addr().parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    durable.close().await.map_err(ServiceError::Persistence)?;
    info!(path = %durable.path().display(), "backing file closed");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!(event = "shutdown_signal", "received Ctrl+C, shutting down"),
        Err(e) => {
            // Without a signal handler the server runs until killed.
            error!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
