//! # Ad Intelligence HTTP Server
//!
//! Wires configuration, the shared `AppState` and the axum router together. The
//! binary in `main.rs` only calls [`start`]; tests call [`run`] with their own listener.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod router;
pub mod state;
pub mod types;

use crate::{
    config::{get_config, AppConfig},
    router::create_router,
    state::build_app_state,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info};
use tracing_subscriber::FmtSubscriber;

/// Builds the application state (database, collaborators, indexing queue) and serves
/// the API on `listener` until the process stops.
pub async fn run(listener: TcpListener, config: AppConfig) -> anyhow::Result<()> {
    debug!(port = config.port, db_url = %config.db_url, "Server configuration loaded");

    let app_state = build_app_state(config).await?;
    let app = create_router(app_state);

    info!("adintel API ready on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Loads `.env`, installs the `RUST_LOG`-driven subscriber, reads the configuration and
/// binds `0.0.0.0:<port>`.
pub async fn start() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = get_config(None)?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    run(listener, config).await
}
