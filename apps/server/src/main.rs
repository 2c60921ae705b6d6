//! KrishiMitra+ backend: health endpoint with CORS for the web client.

mod error;
mod routes;

use std::net::SocketAddr;

use color_eyre::eyre::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use krishimitra_shared::load_config;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("krishimitra=info,tower_http=debug")),
        )
        .init();

    let config = load_config()?.server.with_env_overrides();
    let app = routes::router(&config)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, origin = config.cors_origin(), "starting KrishiMitra+ server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
