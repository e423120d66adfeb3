mod config;
mod http;
mod identity;
mod models;
mod refine;
mod session;
mod state;
mod store;

use std::sync::Arc;

use crate::config::{AppConfig, StorageBackend};
use crate::identity::{FixedCredentialGateway, IdentityGateway};
use crate::refine::GeminiRefiner;
use crate::session::Controller;
use crate::state::AppState;
use crate::store::{DocumentStore, FileStore, KeyValueStore, MemoryStore};
use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = AppConfig::load().context("Failed to load configuration")?;

    let backend = open_backend(&config)?;
    let gateway = Arc::new(FixedCredentialGateway::new(
        &config.auth,
        Arc::clone(&backend),
    ));
    if gateway.is_authenticated() {
        info!("Stored admin token ignored; admin requires a fresh login");
    }
    let controller = Controller::bootstrap(
        DocumentStore::new(backend),
        gateway,
        config.login.error_reset(),
        "/",
    )
    .context("Failed to load stored documents")?;

    let refiner =
        GeminiRefiner::new(&config.refiner).context("Failed to initialize bio refiner")?;
    if refiner.is_configured() {
        info!(
            "Bio refiner ready (timeout {}ms)",
            refiner.timeout().as_millis()
        );
    } else {
        warn!("GEMINI_API_KEY not set; bio refinement requests will fail");
    }

    let app_state = AppState::new(controller.into_shared(), Arc::new(refiner));

    let listener = TcpListener::bind(config.server.address())
        .await
        .context("Failed to bind HTTP listener")?;
    let local_addr = listener
        .local_addr()
        .context("Failed to obtain listener address")?;
    info!("Lumina bio listening on {local_addr}");

    let router: Router = http::router(app_state);
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server exited with error")?;

    Ok(())
}

fn init_tracing() {
    let default_filter = "info";
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    assert!(!filter.is_empty(), "Tracing filter must not be empty");
    assert!(filter.len() < 256, "Tracing filter length exceeds bounds");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .compact()
        .init();
}

fn open_backend(config: &AppConfig) -> Result<Arc<dyn KeyValueStore>> {
    match config.storage.backend {
        StorageBackend::File => {
            let store = FileStore::open(&config.storage.data_dir)
                .context("Failed to open data directory")?;
            info!("Documents stored under {}", store.root().display());
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            warn!("In-memory storage selected; edits are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        return;
    }
    info!("Shutdown signal received");
}
