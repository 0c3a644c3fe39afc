//! `protect-svc` binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing, optional OTLP export).
//! 3. Decode the master key and derive the field cipher.
//! 4. Open the document backend (filesystem or S3) and build the vault.
//! 5. Build the Axum router and serve until interrupted.

mod aws;
mod config;
mod server;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use protect::{BlobStore, DocumentVault, FieldCipher, FilesystemStore};
use tracing::{info, warn};

use config::{Config, StorageBackend};
use server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        http_port = cfg.http_port,
        backend = ?cfg.storage_backend,
        "protect-svc starting"
    );

    // -----------------------------------------------------------------------
    // 3. Keys
    // -----------------------------------------------------------------------
    let master = cfg.master_key()?;
    let cipher = FieldCipher::new(&master).context("failed to derive field key")?;

    // -----------------------------------------------------------------------
    // 4. Document backend
    // -----------------------------------------------------------------------
    let store: Arc<dyn BlobStore> = match cfg.storage_backend {
        StorageBackend::Filesystem => {
            let fs = FilesystemStore::new(&cfg.storage_root);
            info!(root = %fs.root().display(), "using filesystem document backend");
            Arc::new(fs)
        }
        StorageBackend::S3 => {
            let bucket = cfg.s3_bucket.clone().context("S3_BUCKET is required")?;
            let client = aws::s3_client(cfg.s3_endpoint_url.as_deref()).await;
            info!(bucket = %bucket, "using s3 document backend");
            Arc::new(aws::S3Store::new(client, bucket))
        }
    };
    let vault = DocumentVault::new(&master, store, cfg.public_base_url.clone())
        .context("failed to derive document keys")?;
    drop(master);

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(cipher, vault, cfg.access_url_max_minutes);
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.http_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("protect-svc stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
    }
}
