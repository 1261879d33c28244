use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use draft_room_backend::{app, config::Config, db, services::room::RoomRegistry};

const MAX_CONNECTIONS: u32 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    let pool = db::connect(&config.database_url, MAX_CONNECTIONS)
        .await
        .context("could not connect to SQLite")?;

    let rooms = RoomRegistry::new(pool.clone(), config.room_settings());
    let address = config.server_address.clone();
    let router = app(pool, rooms, config);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("could not bind {address}"))?;
    info!("Started server on {}.", address);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down.");
        })
        .await
        .context("server error")?;
    Ok(())
}
