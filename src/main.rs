use tracing_subscriber::EnvFilter;

use poster_frame_api::app::{app, AppState};
use poster_frame_api::config;
use poster_frame_api::database::manager::DatabaseManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config();
    tracing::info!(
        "Starting Poster Frame API in {:?} mode with {:?} mapping policy",
        config.environment,
        config.mapping.policy
    );
    if poster_frame_api::is_development!() {
        tracing::warn!("Development mode: built-in JWT secret in use unless JWT_SECRET is set");
    }
    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set outside development");
    }

    if config.database.run_migrations {
        DatabaseManager::migrate().await?;
    }

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Poster Frame API listening on http://{}", bind_addr);

    axum::serve(listener, app(AppState::from_config()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    DatabaseManager::close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
